#![deny(unsafe_code)]
#![doc = r#"
# spark-rpc-middleware

## 设计动机（Why）
- **定位**：一元 RPC 服务端的三个横切拦截器，各自独立、可任意组合。
- **架构角色**：只依赖 `spark-rpc-contract` 中的拦截器契约；校验引擎与日志后端由宿主注入。

## 核心契约（What）
- [`ValidationInterceptor`]：请求违反约束时以 `InvalidArgument` 拒绝，处理器不被调用；
  可选校验响应，失败时以 `Internal` 拒绝并丢弃响应；
- [`ErrorNormalizationInterceptor`]：远端只会看到结构化状态，未归类错误记录后替换为
  `Internal Error`；
- [`VersionInterceptor`]：每个响应都带 `x-version` 响应头。

## 实现策略（How）
- 推荐顺序（外 → 内）：错误规范化 → 版本标记 → 校验 → 处理器，校验与版本标记产生的
  未归类错误都会被规范化；
- [`format_field_path`] 与 [`violation_status`] 是校验失败到状态的纯函数，可脱离拦截器复用。

## 风险与考量（Trade-offs）
- 拦截器只持有不可变配置，可在任意多个并发调用间共享；校验调用是同步的。
"#]

mod logging;
mod normalize;
mod validation;
mod version;
mod violation;

pub use logging::TracingErrorLogger;
pub use normalize::{
    ErrorNormalizationInterceptor, FIELD_ERROR, FIELD_ERROR_TYPE, HIDDEN_ERROR_LOG_MESSAGE,
    INTERNAL_ERROR_MESSAGE, validation_error_status,
};
pub use validation::{
    ValidationConfig, ValidationConfigError, ValidationError, ValidationInterceptor,
};
pub use version::{VERSION_HEADER, VersionInterceptor};
pub use violation::{Part, format_field_path, violation_status};
