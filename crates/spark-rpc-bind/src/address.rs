use std::{fmt, str::FromStr};

use thiserror::Error;

/// 传输种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Tcp,
    Unix,
}

impl TransportKind {
    pub const fn scheme(self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Unix => "unix",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// 解析后的绑定描述：传输种类 + 传输相关地址。
///
/// # 教案式说明
/// - **意图（Why）**：把“字符串形式多样”的问题收敛在解析阶段，绑定阶段只面对两种传输；
/// - **契约（What）**：`address` 保留原始文本，不做任何规范化（空地址、端口 0、相对路径均原样保留）；
///   主机名缺省等补全工作留给绑定阶段；
/// - **风险（Trade-offs）**：由于不做规范化，语义等价但文本不同的地址不会判等。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindDescriptor {
    transport: TransportKind,
    address: String,
}

impl BindDescriptor {
    pub fn new(transport: TransportKind, address: impl Into<String>) -> Self {
        Self {
            transport,
            address: address.into(),
        }
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for BindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.address)
    }
}

impl FromStr for BindDescriptor {
    type Err = MalformedBindAddress;

    fn from_str(bind: &str) -> Result<Self, Self::Err> {
        resolve(bind)
    }
}

/// 绑定字符串无法解析。启动期致命，不应重试。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MalformedBindAddress {
    #[error("empty bind address")]
    Empty,

    #[error("unsupported bind address `{bind}`, missing scheme")]
    MissingScheme { bind: String },

    #[error("unsupported scheme `{scheme}`")]
    UnsupportedScheme { scheme: String },
}

impl MalformedBindAddress {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "spark.rpc.bind.empty",
            Self::MissingScheme { .. } => "spark.rpc.bind.missing_scheme",
            Self::UnsupportedScheme { .. } => "spark.rpc.bind.unsupported_scheme",
        }
    }
}

const SCHEME_SEPARATOR: &str = "://";

/// 将绑定字符串解析为 [`BindDescriptor`]。
///
/// 规则按优先级：`/` 开头为 Unix 套接字路径；`:` 开头为 TCP 地址；
/// 否则按首个 `://` 切分，左侧必须恰为 `tcp` 或 `unix`，右侧原样作为地址。
pub fn resolve(bind: &str) -> Result<BindDescriptor, MalformedBindAddress> {
    if bind.is_empty() {
        return Err(MalformedBindAddress::Empty);
    }
    if bind.starts_with('/') {
        return Ok(BindDescriptor::new(TransportKind::Unix, bind));
    }
    if bind.starts_with(':') {
        return Ok(BindDescriptor::new(TransportKind::Tcp, bind));
    }

    let Some((scheme, address)) = bind.split_once(SCHEME_SEPARATOR) else {
        return Err(MalformedBindAddress::MissingScheme {
            bind: bind.to_owned(),
        });
    };
    match scheme {
        "tcp" => Ok(BindDescriptor::new(TransportKind::Tcp, address)),
        "unix" => Ok(BindDescriptor::new(TransportKind::Unix, address)),
        other => Err(MalformedBindAddress::UnsupportedScheme {
            scheme: other.to_owned(),
        }),
    }
}
