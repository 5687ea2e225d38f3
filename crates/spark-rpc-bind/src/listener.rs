use std::{
    fmt, io,
    net::SocketAddr,
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::{TcpListener as TokioTcpListener, TcpStream},
};
#[cfg(unix)]
use tokio::net::{UnixListener as TokioUnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::{
    address::{BindDescriptor, TransportKind},
    error::{LifecycleError, cancelled_io_error},
};

/// 空主机的候选绑定主机：先尝试 IPv6 通配地址（双栈系统上同时接收 IPv4），不可用时回退到 IPv4。
const UNSPECIFIED_HOSTS: [&str; 2] = ["[::]", "0.0.0.0"];

/// 已绑定的操作系统监听器。
///
/// # 教案式说明
/// - **意图（Why）**：对服务器实现屏蔽 TCP 与 Unix 套接字的差异，只暴露 `accept`；
/// - **契约（What）**：
///   - 由 [`crate::listen`] 创建，在交给服务循环之前由生命周期管理器独占；
///   - 析构即关闭监听；绑定到文件系统路径的 Unix 监听器同时删除该套接字文件；
/// - **风险（Trade-offs）**：删除套接字文件不校验 inode，若外部进程在关闭前复用了同一路径，
///   其文件也会被删除。
pub struct ListenerHandle {
    descriptor: BindDescriptor,
    inner: ListenerInner,
}

enum ListenerInner {
    Tcp(TokioTcpListener),
    #[cfg(unix)]
    Unix {
        listener: TokioUnixListener,
        socket_path: PathBuf,
    },
}

impl ListenerHandle {
    /// 在上下文约束下绑定描述符指向的地址。
    ///
    /// 上下文已取消或在绑定过程中被取消时，返回 `Interrupted` 类型的 [`LifecycleError::Listen`]。
    pub async fn bind(
        ctx: &CancellationToken,
        descriptor: BindDescriptor,
    ) -> Result<Self, LifecycleError> {
        if ctx.is_cancelled() {
            return Err(LifecycleError::Listen {
                descriptor,
                source: cancelled_io_error(),
            });
        }

        let transport = descriptor.transport();
        let address = descriptor.address().to_owned();
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(cancelled_io_error()),
            result = bind_inner(transport, address) => result,
        };
        match result {
            Ok(inner) => Ok(Self { descriptor, inner }),
            Err(source) => Err(LifecycleError::Listen { descriptor, source }),
        }
    }

    pub fn descriptor(&self) -> &BindDescriptor {
        &self.descriptor
    }

    /// 实际绑定的本地地址（TCP 端口 0 时可据此取得分配的端口）。
    pub fn local_addr(&self) -> io::Result<LocalAddr> {
        match &self.inner {
            ListenerInner::Tcp(listener) => listener.local_addr().map(LocalAddr::Tcp),
            #[cfg(unix)]
            ListenerInner::Unix { listener, .. } => listener
                .local_addr()
                .map(|addr| LocalAddr::Unix(addr.as_pathname().map(|path| path.to_path_buf()))),
        }
    }

    /// 接受一个入站连接。
    pub async fn accept(&self) -> io::Result<(Connection, PeerAddr)> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((Connection::Tcp(stream), PeerAddr::Tcp(peer)))
            }
            #[cfg(unix)]
            ListenerInner::Unix { listener, .. } => {
                let (stream, peer) = listener.accept().await?;
                let peer = PeerAddr::Unix(peer.as_pathname().map(|path| path.to_path_buf()));
                Ok((Connection::Unix(stream), peer))
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let ListenerInner::Unix { socket_path, .. } = &self.inner
            && let Err(err) = std::fs::remove_file(socket_path)
            && err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(
                path = %socket_path.display(),
                error = %err,
                "failed to remove unix socket file"
            );
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("descriptor", &self.descriptor)
            .field("local_addr", &self.local_addr().ok())
            .finish()
    }
}

async fn bind_inner(transport: TransportKind, address: String) -> io::Result<ListenerInner> {
    match transport {
        TransportKind::Tcp => bind_tcp(&address).await.map(ListenerInner::Tcp),
        TransportKind::Unix => bind_unix(address),
    }
}

#[cfg(unix)]
fn bind_unix(address: String) -> io::Result<ListenerInner> {
    let socket_path = PathBuf::from(address);
    let listener = TokioUnixListener::bind(&socket_path)?;
    Ok(ListenerInner::Unix {
        listener,
        socket_path,
    })
}

#[cfg(not(unix))]
fn bind_unix(_address: String) -> io::Result<ListenerInner> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unix domain sockets are not supported on this platform",
    ))
}

/// 依次尝试候选地址；地址占用与权限不足对所有候选都成立，直接返回。
async fn bind_tcp(address: &str) -> io::Result<TokioTcpListener> {
    let mut last_error = None;
    for target in tcp_bind_targets(address) {
        match TokioTcpListener::bind(target.as_str()).await {
            Ok(listener) => return Ok(listener),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied
                ) =>
            {
                return Err(err);
            }
            Err(err) => {
                tracing::debug!(addr = %target, error = %err, "tcp bind candidate unavailable");
                last_error = Some(err);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "no tcp bind target")
    }))
}

/// 补全 TCP 地址中缺省的主机与端口：空主机展开为全部接口的候选列表，空端口交给内核分配。
fn tcp_bind_targets(address: &str) -> Vec<String> {
    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, if port.is_empty() { "0" } else { port }),
        None if address.is_empty() => ("", "0"),
        None => return vec![address.to_owned()],
    };
    if host.is_empty() {
        UNSPECIFIED_HOSTS
            .iter()
            .map(|host| format!("{host}:{port}"))
            .collect()
    } else {
        vec![format!("{host}:{port}")]
    }
}

/// 监听器的本地地址。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalAddr {
    Tcp(SocketAddr),
    /// 未命名（例如抽象命名空间）套接字时为 `None`。
    Unix(Option<PathBuf>),
}

impl fmt::Display for LocalAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalAddr::Tcp(addr) => write!(f, "tcp://{addr}"),
            LocalAddr::Unix(Some(path)) => write!(f, "unix://{}", path.display()),
            LocalAddr::Unix(None) => f.write_str("unix://(unnamed)"),
        }
    }
}

/// 入站连接的对端地址。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerAddr {
    Tcp(SocketAddr),
    Unix(Option<PathBuf>),
}

/// 已接受的入站连接，对 TCP 与 Unix 流统一实现异步读写。
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
