use std::io;

use thiserror::Error;

use crate::{
    address::{BindDescriptor, MalformedBindAddress},
    lifecycle::SessionState,
};

/// 服务循环返回的失败。
#[derive(Debug, Error)]
pub enum ServeError {
    /// 接受连接时出现不可恢复的 IO 错误。
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// 服务器实现自身的失败。
    #[error("server failure: {0}")]
    Server(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ServeError {
    pub fn server<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Server(Box::new(error))
    }
}

/// 监听器生命周期错误。
///
/// # 教案式说明
/// - **意图（Why）**：绑定字符串错误、操作系统绑定失败、服务循环失败分别对应启动期配置错误、
///   环境问题与运行期故障，调用方的处置方式各不相同；
/// - **契约（What）**：`Listen`/`Serve` 携带出错的 [`BindDescriptor`]，便于日志直接定位监听点；
///   [`LifecycleError::code`] 返回稳定错误码；
/// - **风险（Trade-offs）**：取消导致的绑定失败同样归入 `Listen`，底层错误类型为
///   [`io::ErrorKind::Interrupted`]，调用方若需区分请检查 `source`。
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Malformed(#[from] MalformedBindAddress),

    #[error("listen on {descriptor} failed: {source}")]
    Listen {
        descriptor: BindDescriptor,
        #[source]
        source: io::Error,
    },

    #[error("serving {descriptor} failed: {source}")]
    Serve {
        descriptor: BindDescriptor,
        #[source]
        source: ServeError,
    },

    #[error("server session cannot move from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

impl LifecycleError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(err) => err.code(),
            Self::Listen { .. } => "spark.rpc.bind.listen_failed",
            Self::Serve { .. } => "spark.rpc.bind.serve_failed",
            Self::InvalidTransition { .. } => "spark.rpc.bind.invalid_transition",
        }
    }
}

/// 上下文已取消时绑定返回的底层错误。
pub(crate) fn cancelled_io_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "operation was canceled")
}

/// 判断接受连接时的错误是否只影响单个连接，可继续接受后续连接。
pub(crate) fn is_transient_accept_error(error: &io::Error) -> bool {
    use io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}
