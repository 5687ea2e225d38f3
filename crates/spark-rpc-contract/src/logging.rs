use crate::context::RpcContext;

/// 结构化日志字段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogField<'a> {
    pub key: &'static str,
    pub value: &'a str,
}

impl<'a> LogField<'a> {
    pub const fn new(key: &'static str, value: &'a str) -> Self {
        Self { key, value }
    }
}

/// 错误日志汇。
///
/// - **意图（Why）**：错误规范化拦截器在隐藏内部错误时必须留下完整记录，
///   日志后端由宿主决定，因此以 trait 注入；
/// - **契约（What）**：实现必须线程安全且不得 panic；字段顺序即调用方给出的顺序。
pub trait ErrorLogger: Send + Sync {
    fn error_with_context(&self, ctx: &RpcContext, message: &str, fields: &[LogField<'_>]);
}
