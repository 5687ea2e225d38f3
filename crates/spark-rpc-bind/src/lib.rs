#![deny(unsafe_code)]
#![doc = r#"
# spark-rpc-bind

## 设计动机（Why）
- **定位**：把一条原始绑定字符串变成一个正在运行、可优雅停止的监听器。
- **架构角色**：位于 RPC 服务器之下、操作系统套接字之上；服务器本身以
  [`RpcServer`] 抽象注入，本 crate 只负责“绑定 → 服务 → 停止”的编排。

## 核心契约（What）
- [`resolve`]：纯函数，解析 `/path`、`:port`、`tcp://ADDR`、`unix://PATH` 四种形式；
- [`listen`]：在可取消上下文中完成绑定，取消与地址占用都以
  [`LifecycleError::Listen`] 返回；
- [`serve`]：调用方任务运行服务循环，另有且仅有一个看守任务等待上下文取消后
  调用一次 [`RpcServer::stop_gracefully`]；
- [`listen_and_serve`]：两者组合，绑定失败时不会进入服务阶段。

## 实现策略（How）
- 取消上下文使用 `tokio_util::sync::CancellationToken`，绑定与取消通过
  `tokio::select!` 竞速，取消分支优先；
- 会话状态机 `Created → Bound → Serving → {Stopped | Failed}` 由 [`ServerSession`] 持有，
  每次状态迁移输出结构化日志；
- [`AcceptLoop`] 提供一个可直接复用的 [`RpcServer`] 实现：停止时拒绝新连接，
  等待已接受连接自然结束。

## 风险与考量（Trade-offs）
- 若调用方从不取消上下文，看守任务会一直驻留到运行时退出；服务循环本身的退出不依赖它。
- Unix 套接字文件在监听器析构时删除，同一路径被外部进程复用时需自行协调。
"#]

mod accept_loop;
mod address;
mod error;
mod lifecycle;
mod listener;

pub use accept_loop::{AcceptLoop, ConnectionHandler};
pub use address::{BindDescriptor, MalformedBindAddress, TransportKind, resolve};
pub use error::{LifecycleError, ServeError};
pub use lifecycle::{RpcServer, ServerSession, SessionState, listen, listen_and_serve, serve};
pub use listener::{Connection, ListenerHandle, LocalAddr, PeerAddr};
