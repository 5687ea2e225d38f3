use std::{any::Any, fmt};

/// 可被校验引擎识别的结构化消息。
///
/// 校验预言机只依赖此 trait；需要访问具体字段的实现可借助 `Any` 超 trait 向下转型。
pub trait StructuredMessage: Any + Send + Sync + fmt::Debug {
    /// 消息的完整类型名，例如 `demo.v1.CreateUserRequest`。
    fn full_name(&self) -> &str;
}

/// 拦截器链上流转的请求/响应负载。
///
/// # 教案式说明
/// - **意图（Why）**：拦截器链是类型擦除的，校验拦截器却需要知道“这条消息能否交给校验引擎”。
///   `structured` 以显式可选能力回答这个问题，取代运行时反射；
/// - **契约（What）**：默认实现返回 `None`，表示消息不具备结构化视图；结构化消息通常直接
///   返回 `Some(self)`；
/// - **风险（Trade-offs）**：忘记覆盖 `structured` 的消息会被校验拦截器视为装配错误，
///   以内部错误拒绝，而不是静默跳过校验。
pub trait RpcMessage: Any + Send + Sync + fmt::Debug {
    fn structured(&self) -> Option<&dyn StructuredMessage> {
        None
    }
}

/// 链路中的装箱负载。
pub type Payload = Box<dyn RpcMessage>;

impl dyn RpcMessage {
    /// 向下转型为具体消息类型。
    pub fn downcast_ref<T: RpcMessage>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

impl dyn StructuredMessage {
    pub fn downcast_ref<T: StructuredMessage>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}
