#![deny(unsafe_code)]
#![doc = r#"
# spark-rpc-contract

## 设计动机（Why）
- **定位**：RPC 边界层的公共契约 crate，集中定义远端调用方唯一可见的
  [`Status`]、调用级上下文 [`RpcContext`]、处理器错误 [`RpcError`] 以及
  一元调用拦截器链 [`InterceptorChain`]。
- **架构角色**：`spark-rpc-bind` 与 `spark-rpc-middleware` 都只依赖本 crate，
  校验引擎、日志后端与传输实现以 trait 形式注入，彼此不感知具体类型。

## 核心契约（What）
- [`Status`] 是失败路径上唯一允许跨越进程边界的产物：数值码 + 人类可读消息 +
  零或多条类型化明细；
- [`RpcError`] 将处理器错误二分为“已携带状态码”与“未归类”两类，后者必须在
  出进程前被净化；
- [`RpcMessage::structured`] 以显式可选能力表达“消息是否可被校验引擎识别”，
  不依赖运行时反射；
- [`Validator`] 与 [`ErrorLogger`] 分别抽象校验预言机与日志汇。

## 实现策略（How）
- 拦截器基于 `async_trait` 暴露对象安全的异步接口，链路按注册顺序由外向内执行；
- 出站元数据由调用上下文持有，内部以 `parking_lot::Mutex` 保护，是单次调用内
  唯一的可变状态。
"#]

pub mod context;
pub mod error;
pub mod interceptor;
pub mod logging;
pub mod message;
pub mod metadata;
pub mod status;
pub mod validate;

pub use async_trait::async_trait;
pub use context::RpcContext;
pub use error::{BoxError, RpcError};
pub use interceptor::{
    FnHandler, InterceptedHandler, InterceptorChain, Next, UnaryHandler, UnaryInterceptor,
    UnaryResult, handler_fn,
};
pub use logging::{ErrorLogger, LogField};
pub use message::{Payload, RpcMessage, StructuredMessage};
pub use metadata::{Metadata, MetadataError};
pub use status::{Code, Status, StatusDetail};
pub use validate::{
    FieldPathElement, Subscript, VIOLATIONS_TYPE_URL, ValidationFailure, Validator,
    ValidatorError, Violation,
};
