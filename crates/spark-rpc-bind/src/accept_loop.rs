use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, warn};

use crate::{
    error::{ServeError, is_transient_accept_error},
    lifecycle::RpcServer,
    listener::{Connection, ListenerHandle, PeerAddr},
};

/// 单个连接的处理逻辑，通常是传输层的协议驱动。
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, connection: Connection, peer: PeerAddr);
}

/// 通用接受循环，把每个入站连接交给 [`ConnectionHandler`] 在独立任务中处理。
///
/// # 教案式说明
/// - **意图（Why）**：为没有现成服务器实现的宿主提供符合 [`RpcServer`] 语义的最小服务器，
///   同时作为优雅停止语义的参考实现；
/// - **契约（What）**：
///   - `serve` 循环接受连接，瞬时错误（连接被对端中止/重置等）只记录告警并继续；
///   - `stop_gracefully` 令 `serve` 立即返回（监听器随之关闭，新连接被拒绝），
///     随后等待所有已接受连接的处理任务结束；
/// - **执行（How）**：停止信号为内部 `CancellationToken`，连接任务由 `TaskTracker` 跟踪；
/// - **风险（Trade-offs）**：处理任务不受停止信号约束，长连接会无限期推迟
///   `stop_gracefully` 的返回，需由处理器自行设定超时。
pub struct AcceptLoop<H> {
    handler: Arc<H>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl<H: ConnectionHandler> AcceptLoop<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// 仍在处理中的连接数。
    pub fn active_connections(&self) -> usize {
        self.tracker.len()
    }
}

#[async_trait]
impl<H: ConnectionHandler> RpcServer for AcceptLoop<H> {
    async fn serve(&self, listener: ListenerHandle) -> Result<(), ServeError> {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(bind = %listener.descriptor(), "accept loop stopped, refusing new connections");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (connection, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) if is_transient_accept_error(&err) => {
                            warn!(bind = %listener.descriptor(), error = %err, "transient accept failure");
                            continue;
                        }
                        Err(err) => return Err(ServeError::Accept(err)),
                    };
                    debug!(peer = ?peer, "connection accepted");
                    let handler = Arc::clone(&self.handler);
                    self.tracker.spawn(async move {
                        handler.handle(connection, peer).await;
                    });
                }
            }
        }
    }

    async fn stop_gracefully(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl<H> fmt::Debug for AcceptLoop<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptLoop")
            .field("stopping", &self.shutdown.is_cancelled())
            .field("active_connections", &self.tracker.len())
            .finish()
    }
}
