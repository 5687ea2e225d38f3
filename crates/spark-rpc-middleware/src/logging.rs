use std::fmt;

use spark_rpc_contract::{ErrorLogger, LogField, RpcContext};

/// 以 `tracing` 事件实现的 [`ErrorLogger`]。
///
/// # 教案式说明
/// - **意图（Why）**：宿主已经安装了 `tracing` 订阅者时，无需再为拦截器单独接日志后端；
/// - **契约（What）**：每次调用输出一条 `ERROR` 级事件，`method` 字段为调用方法名，
///   `fields` 字段按给定顺序渲染为 `key=value` 列表，事件消息即 `message`；
/// - **风险（Trade-offs）**：`tracing` 的字段名必须在编译期确定，调用方字段只能合并为一个
///   文本字段，检索时需按文本匹配。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorLogger;

impl ErrorLogger for TracingErrorLogger {
    fn error_with_context(&self, ctx: &RpcContext, message: &str, fields: &[LogField<'_>]) {
        tracing::error!(
            method = ctx.method(),
            fields = %RenderedFields(fields),
            "{message}"
        );
    }
}

struct RenderedFields<'a>(&'a [LogField<'a>]);

impl fmt::Display for RenderedFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, field) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", field.key, field.value)?;
        }
        Ok(())
    }
}
