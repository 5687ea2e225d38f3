use std::sync::Arc;

use spark_rpc_bind::{LifecycleError, RpcServer, listen_and_serve};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::settings::EdgeSettings;

/// 按配置运行一个 RPC 服务器的宿主。
///
/// # 教案式说明
/// - **意图（Why）**：进程入口只需“加载配置 → 装配服务器 → 运行到取消”三步，
///   宿主把第三步的日志与生命周期调用收拢到一处；
/// - **契约（What）**：[`EdgeHost::run`] 绑定 `settings.bind` 并服务，直到 `ctx` 被取消后
///   服务器完成优雅停止，或绑定/服务失败；
/// - **风险（Trade-offs）**：宿主不安装日志订阅者，进程入口应先调用
///   [`crate::observability::install`]。
#[derive(Clone, Debug)]
pub struct EdgeHost {
    settings: EdgeSettings,
}

impl EdgeHost {
    pub fn new(settings: EdgeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EdgeSettings {
        &self.settings
    }

    pub async fn run<S>(&self, ctx: &CancellationToken, server: Arc<S>) -> Result<(), LifecycleError>
    where
        S: RpcServer + ?Sized,
    {
        info!(
            bind = %self.settings.bind,
            version = %self.settings.version,
            validate_reply = self.settings.validate_reply,
            "starting edge host"
        );
        match listen_and_serve(ctx, server, &self.settings.bind).await {
            Ok(()) => {
                info!(bind = %self.settings.bind, "edge host stopped");
                Ok(())
            }
            Err(err) => {
                error!(bind = %self.settings.bind, code = err.code(), error = %err, "edge host failed");
                Err(err)
            }
        }
    }
}
