//! 优雅停止集成测试：两个连接在取消前已被接受，取消一次上下文后停止恰好执行一次，
//! 且已接受的连接不会被生命周期管理器强行断开；服务调用在连接排空后才返回。

#![cfg(unix)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use spark_rpc_bind::{
    AcceptLoop, Connection, ConnectionHandler, ListenerHandle, PeerAddr, RpcServer, ServeError,
    listen, listen_and_serve, serve,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
    sync::mpsc,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// 把接受到的连接交给测试、把停止调用报告给测试的模拟服务器。
struct MockServer {
    accepted: mpsc::UnboundedSender<Connection>,
    stopped: mpsc::UnboundedSender<()>,
    stop_calls: AtomicUsize,
    halt: CancellationToken,
}

#[async_trait]
impl RpcServer for MockServer {
    async fn serve(&self, listener: ListenerHandle) -> Result<(), ServeError> {
        loop {
            tokio::select! {
                _ = self.halt.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (connection, _peer) = accepted.map_err(ServeError::Accept)?;
                    let _ = self.accepted.send(connection);
                }
            }
        }
    }

    async fn stop_gracefully(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.halt.cancel();
        let _ = self.stopped.send(());
    }
}

/// 教案级集成测试：复刻“连接两次 → 取消 → 等待停止”的挂断场景。
#[tokio::test(flavor = "multi_thread")]
async fn hangup_after_two_connections_stops_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("test.sock");
    let bind = format!("unix://{}", socket.display());

    let ctx = CancellationToken::new();
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();
    let (stopped_tx, mut stopped_rx) = mpsc::unbounded_channel();
    let server = Arc::new(MockServer {
        accepted: accepted_tx,
        stopped: stopped_tx,
        stop_calls: AtomicUsize::new(0),
        halt: CancellationToken::new(),
    });

    let listener = listen(&ctx, &bind).await.expect("listen on unix socket");
    let serve_task = tokio::spawn({
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        async move { serve(&ctx, server, listener).await }
    });

    let mut client1 = UnixStream::connect(&socket).await.expect("dial 1");
    let mut server_conn1 = timeout(WAIT, accepted_rx.recv())
        .await
        .expect("accept 1 in time")
        .expect("accept 1");
    let mut client2 = UnixStream::connect(&socket).await.expect("dial 2");
    let _server_conn2 = timeout(WAIT, accepted_rx.recv())
        .await
        .expect("accept 2 in time")
        .expect("accept 2");

    ctx.cancel();

    timeout(WAIT, stopped_rx.recv())
        .await
        .expect("graceful stop in time")
        .expect("graceful stop");
    let served = timeout(WAIT, serve_task)
        .await
        .expect("serve unblocked")
        .expect("serve task joined");
    assert!(served.is_ok(), "serve returned {served:?}");
    assert_eq!(server.stop_calls.load(Ordering::SeqCst), 1);

    // 已接受的连接仍然可用。
    client1.write_all(b"ping").await.expect("client write");
    let mut buf = [0u8; 4];
    server_conn1.read_exact(&mut buf).await.expect("server read");
    assert_eq!(&buf, b"ping");

    client1.shutdown().await.expect("close client 1");
    client2.shutdown().await.expect("close client 2");
}

struct Echo;

#[async_trait]
impl ConnectionHandler for Echo {
    async fn handle(&self, mut connection: Connection, _peer: PeerAddr) {
        let mut buf = [0u8; 64];
        loop {
            match connection.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    if connection.write_all(&buf[..n]).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// 接受循环在停止后拒绝新连接，服务调用一直等到已接受连接自然结束才返回。
#[tokio::test(flavor = "multi_thread")]
async fn accept_loop_drains_accepted_connections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("echo.sock");
    let bind = format!("unix://{}", socket.display());

    let ctx = CancellationToken::new();
    let server = Arc::new(AcceptLoop::new(Echo));
    let listener = listen(&ctx, &bind).await.expect("listen");
    let serve_task = tokio::spawn({
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        async move { serve(&ctx, server, listener).await }
    });

    let mut client = UnixStream::connect(&socket).await.expect("dial");
    client.write_all(b"hello").await.expect("write before stop");
    let mut buf = [0u8; 5];
    client.read_exact(&mut buf).await.expect("echo before stop");
    assert_eq!(&buf, b"hello");

    ctx.cancel();

    // 监听器关闭（套接字文件随之删除）后新连接被拒绝。
    timeout(WAIT, async {
        while socket.exists() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener closed");
    assert!(UnixStream::connect(&socket).await.is_err());

    // 已接受的连接继续工作，服务调用仍在等待它结束。
    client.write_all(b"again").await.expect("write after stop");
    client.read_exact(&mut buf).await.expect("echo after stop");
    assert_eq!(&buf, b"again");
    assert_eq!(server.active_connections(), 1);
    assert!(!serve_task.is_finished());

    drop(client);
    let served = timeout(WAIT, serve_task)
        .await
        .expect("serve unblocked")
        .expect("serve task joined");
    assert!(served.is_ok(), "serve returned {served:?}");
    assert_eq!(server.active_connections(), 0);
}

/// 读到一个字节后继续忙碌一段时间的处理器。
struct Busy {
    working: mpsc::UnboundedSender<()>,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl ConnectionHandler for Busy {
    async fn handle(&self, mut connection: Connection, _peer: PeerAddr) {
        let mut byte = [0u8; 1];
        if connection.read_exact(&mut byte).await.is_err() {
            return;
        }
        let _ = self.working.send(());
        sleep(Duration::from_millis(300)).await;
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn listen_and_serve_waits_for_busy_handler() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("busy.sock");
    let bind = format!("unix://{}", socket.display());

    let (working_tx, mut working_rx) = mpsc::unbounded_channel();
    let finished = Arc::new(AtomicBool::new(false));
    let server = Arc::new(AcceptLoop::new(Busy {
        working: working_tx,
        finished: Arc::clone(&finished),
    }));

    let ctx = CancellationToken::new();
    let running = tokio::spawn({
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        async move { listen_and_serve(&ctx, server, &bind).await }
    });

    let mut client = timeout(WAIT, async {
        loop {
            match UnixStream::connect(&socket).await {
                Ok(stream) => return stream,
                Err(_) => sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .expect("server listening");
    client.write_all(b"x").await.expect("send byte");
    timeout(WAIT, working_rx.recv())
        .await
        .expect("handler busy in time")
        .expect("handler busy");

    ctx.cancel();
    let outcome = timeout(WAIT, running)
        .await
        .expect("host stops")
        .expect("task joined");
    assert!(outcome.is_ok(), "listen_and_serve returned {outcome:?}");
    assert!(finished.load(Ordering::SeqCst), "handler finished before return");
    assert_eq!(server.active_connections(), 0);
}
