#![deny(unsafe_code)]
#![doc = r#"
# spark-rpc-hosting

## 设计动机（Why）
- **定位**：RPC 边界层的进程级装配：读取配置、安装日志、按固定顺序组装拦截器链、
  驱动监听器生命周期。
- **架构角色**：位于 `spark-rpc-bind` 与 `spark-rpc-middleware` 之上，是应用入口唯一需要
  直接依赖的 crate。

## 核心契约（What）
- [`EdgeSettings`]：TOML 配置，加载时完成绑定字符串与版本号校验；
- [`observability::install`]：安装一次全局 `tracing` 订阅者；
- [`EdgePipeline`]：错误规范化 → 版本标记 → 校验 的拦截器链；
- [`EdgeHost`]：按配置绑定并服务，直到上下文取消。

## 风险与考量（Trade-offs）
- 全局订阅者一经安装无法替换；测试进程若已设置订阅者，`install` 会返回错误而不是覆盖。
"#]

mod host;
pub mod observability;
mod pipeline;
mod settings;

pub use host::EdgeHost;
pub use observability::ObservabilityError;
pub use pipeline::{EdgePipeline, EdgePipelineBuilder, PipelineBuildError};
pub use settings::{EdgeSettings, SettingsError};
