use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    address::{BindDescriptor, resolve},
    error::{LifecycleError, ServeError},
    listener::ListenerHandle,
};

/// 被驱动的 RPC 服务器。
///
/// - `serve`：阻塞式服务循环，直到监听器被优雅停止关闭或出现错误才返回；
/// - `stop_gracefully`：拒绝新连接并等待已接受的连接结束，必须能让 `serve` 返回。
///   生命周期管理器保证每个会话至多调用一次。
#[async_trait]
pub trait RpcServer: Send + Sync + 'static {
    async fn serve(&self, listener: ListenerHandle) -> Result<(), ServeError>;

    async fn stop_gracefully(&self);
}

/// 服务会话状态：`Created → Bound → Serving → {Stopped | Failed}`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Bound,
    Serving,
    Stopped,
    Failed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Bound => "bound",
            SessionState::Serving => "serving",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次“绑定 + 服务”的运行实体。
///
/// # 教案式说明
/// - **意图（Why）**：把 `(server, listener)` 的所有权与状态机放在同一处，非法迁移在类型之外
///   也能被显式拒绝，而不是静默地重复绑定或重复服务；
/// - **契约（What）**：
///   - [`ServerSession::listen`] 仅在 `Created` 下可调用，成功进入 `Bound`，失败进入 `Failed`；
///   - [`ServerSession::serve`] 仅在 `Bound` 下可调用，返回时处于 `Stopped` 或 `Failed`；
///   - 其余调用返回 [`LifecycleError::InvalidTransition`]，状态保持不变；
/// - **执行（How）**：服务阶段派生恰好一个看守任务，它先等待服务循环开始，再等待上下文取消，
///   随后调用一次 [`RpcServer::stop_gracefully`] 并退出；服务循环返回时若上下文已取消，
///   会先等待该任务结束（即已接受连接排空）再进入 `Stopped`；
/// - **风险（Trade-offs）**：服务循环因错误提前返回时，看守任务仍会在上下文取消时触发停止，
///   与服务器自身的停止幂等性相互配合。
pub struct ServerSession<S: ?Sized> {
    server: Arc<S>,
    listener: Option<ListenerHandle>,
    state: SessionState,
}

impl<S> ServerSession<S>
where
    S: RpcServer + ?Sized,
{
    pub fn new(server: Arc<S>) -> Self {
        Self {
            server,
            listener: None,
            state: SessionState::Created,
        }
    }

    /// 以已绑定的监听器直接构造 `Bound` 状态的会话。
    pub fn bound(server: Arc<S>, listener: ListenerHandle) -> Self {
        Self {
            server,
            listener: Some(listener),
            state: SessionState::Bound,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `Bound` 状态下的监听器。
    pub fn listener(&self) -> Option<&ListenerHandle> {
        self.listener.as_ref()
    }

    pub async fn listen(
        &mut self,
        ctx: &CancellationToken,
        bind: &str,
    ) -> Result<(), LifecycleError> {
        self.ensure_state(SessionState::Created, SessionState::Bound)?;
        match listen(ctx, bind).await {
            Ok(listener) => {
                self.listener = Some(listener);
                self.transition(SessionState::Bound);
                Ok(())
            }
            Err(err) => {
                self.transition(SessionState::Failed);
                Err(err)
            }
        }
    }

    pub async fn serve(&mut self, ctx: &CancellationToken) -> Result<(), LifecycleError> {
        self.ensure_state(SessionState::Bound, SessionState::Serving)?;
        let Some(listener) = self.listener.take() else {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: SessionState::Serving,
            });
        };
        let descriptor = listener.descriptor().clone();
        self.transition(SessionState::Serving);

        let (started_tx, started_rx) = oneshot::channel();
        let watcher = spawn_stop_watcher(
            ctx.clone(),
            Arc::clone(&self.server),
            started_rx,
            descriptor.clone(),
        );

        let server = Arc::clone(&self.server);
        let outcome = async move {
            // 看守任务只有在服务循环被进入后才可能触发停止。
            if started_tx.send(()).is_err() {
                debug!("stop watcher exited before serve loop started");
            }
            server.serve(listener).await
        }
        .await;

        // 取消触发的返回只代表监听器已关闭，已接受连接的排空仍在看守任务的 `stop_gracefully` 中。
        if ctx.is_cancelled()
            && let Err(err) = watcher.await
        {
            warn!(bind = %descriptor, error = %err, "graceful stop task did not complete");
        }

        match outcome {
            Ok(()) => {
                self.transition(SessionState::Stopped);
                info!(bind = %descriptor, "server stopped");
                Ok(())
            }
            Err(source) => {
                self.transition(SessionState::Failed);
                warn!(bind = %descriptor, error = %source, "serve loop failed");
                Err(LifecycleError::Serve { descriptor, source })
            }
        }
    }

    fn ensure_state(&self, expected: SessionState, to: SessionState) -> Result<(), LifecycleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    fn transition(&mut self, to: SessionState) {
        debug!(from = %self.state, to = %to, "server session transition");
        self.state = to;
    }
}

impl<S: ?Sized> fmt::Debug for ServerSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("state", &self.state)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

fn spawn_stop_watcher<S>(
    ctx: CancellationToken,
    server: Arc<S>,
    started: oneshot::Receiver<()>,
    descriptor: BindDescriptor,
) -> JoinHandle<()>
where
    S: RpcServer + ?Sized,
{
    tokio::spawn(async move {
        if started.await.is_err() {
            return;
        }
        ctx.cancelled().await;
        info!(bind = %descriptor, "context cancelled, stopping server gracefully");
        server.stop_gracefully().await;
    })
}

/// 解析绑定字符串并打开监听器。
pub async fn listen(ctx: &CancellationToken, bind: &str) -> Result<ListenerHandle, LifecycleError> {
    let descriptor = resolve(bind)?;
    let listener = ListenerHandle::bind(ctx, descriptor).await?;
    info!(
        bind = %listener.descriptor(),
        transport = %listener.descriptor().transport(),
        "listener bound"
    );
    Ok(listener)
}

/// 在监听器上运行服务器，直到上下文取消触发优雅停止或服务循环出错。
pub async fn serve<S>(
    ctx: &CancellationToken,
    server: Arc<S>,
    listener: ListenerHandle,
) -> Result<(), LifecycleError>
where
    S: RpcServer + ?Sized,
{
    ServerSession::bound(server, listener).serve(ctx).await
}

/// 绑定并服务；绑定失败时不会进入服务阶段。
pub async fn listen_and_serve<S>(
    ctx: &CancellationToken,
    server: Arc<S>,
    bind: &str,
) -> Result<(), LifecycleError>
where
    S: RpcServer + ?Sized,
{
    let mut session = ServerSession::new(server);
    session.listen(ctx, bind).await?;
    session.serve(ctx).await
}
