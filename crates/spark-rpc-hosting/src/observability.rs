use std::sync::OnceLock;

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, filter::ParseError, layer::SubscriberExt};

/// 安装成功后置位，保证全局订阅者只安装一次。
static INSTALLED: OnceLock<()> = OnceLock::new();

/// 日志安装失败。
///
/// # 教案式说明
/// - **意图（Why）**：全局订阅者只能设置一次，重复安装与“外部已接管”需要被调用方区分处理；
/// - **契约（What）**：`AlreadyInstalled` 表示本函数已成功执行过；`SubscriberAlreadySet`
///   表示其他组件先设置了订阅者；`InvalidFilter` 表示缺省过滤指令无法解析。
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("observability already installed, install must be called only once")]
    AlreadyInstalled,

    #[error("a global tracing subscriber is already set")]
    SubscriberAlreadySet,

    #[error("invalid log filter `{filter}`: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobal(#[source] tracing::subscriber::SetGlobalDefaultError),
}

impl ObservabilityError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInstalled => "spark.rpc.observability.already_installed",
            Self::SubscriberAlreadySet => "spark.rpc.observability.subscriber_already_set",
            Self::InvalidFilter { .. } => "spark.rpc.observability.invalid_filter",
            Self::SetGlobal(_) => "spark.rpc.observability.set_global_failed",
        }
    }
}

/// 安装全局 `tracing` 订阅者：`fmt` 输出 + `EnvFilter` 过滤。
///
/// 过滤指令优先取 `RUST_LOG`，未设置或无法解析时使用 `default_filter`
/// （通常来自 [`crate::EdgeSettings::log_filter`]）。
pub fn install(default_filter: &str) -> Result<(), ObservabilityError> {
    if INSTALLED.get().is_some() {
        return Err(ObservabilityError::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(ObservabilityError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(default_filter)?)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).map_err(ObservabilityError::SetGlobal)?;

    INSTALLED
        .set(())
        .map_err(|_| ObservabilityError::AlreadyInstalled)
}

fn build_env_filter(default_filter: &str) -> Result<EnvFilter, ObservabilityError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(default_filter),
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter, ObservabilityError> {
    EnvFilter::try_new(directives).map_err(|source| ObservabilityError::InvalidFilter {
        filter: directives.to_owned(),
        source,
    })
}
