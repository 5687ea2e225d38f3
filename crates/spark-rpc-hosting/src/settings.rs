//! 边界层启动配置。
//!
//! ## 意图（Why）
//! - 绑定地址、服务版本与响应校验开关都是部署期决定的参数，集中在一份 TOML 中，
//!   启动时一次性校验，避免服务跑起来之后才暴露配置错误。
//!
//! ## 契约（What）
//! - 未知字段直接拒绝；`bind` 必须能被绑定字符串解析器接受；`version` 不能为空白；
//! - `validate_reply` 缺省为 `false`，`log_filter` 缺省为 `info`。

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use spark_rpc_bind::{BindDescriptor, MalformedBindAddress, resolve};
use thiserror::Error;

const DEFAULT_LOG_FILTER: &str = "info";

/// 边界层配置。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EdgeSettings {
    /// 绑定字符串，例如 `tcp://:8080` 或 `unix:///run/edge.sock`。
    pub bind: String,
    /// 写入 `x-version` 响应头的服务版本。
    pub version: String,
    #[serde(default)]
    pub validate_reply: bool,
    /// 未设置 `RUST_LOG` 时使用的日志过滤指令。
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

impl EdgeSettings {
    /// 以代码构造配置，其余字段取缺省值。
    pub fn new(bind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            version: version.into(),
            validate_reply: false,
            log_filter: default_log_filter(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// 校验字段之间不依赖解析过程的约束；以代码构造的配置也应调用一次。
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version.trim().is_empty() {
            return Err(SettingsError::EmptyVersion);
        }
        self.bind_descriptor()?;
        Ok(())
    }

    pub fn bind_descriptor(&self) -> Result<BindDescriptor, SettingsError> {
        resolve(&self.bind).map_err(|source| SettingsError::Bind {
            bind: self.bind.clone(),
            source,
        })
    }
}

/// 配置加载失败。
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`version` must not be empty")]
    EmptyVersion,

    #[error("invalid `bind` value `{bind}`: {source}")]
    Bind {
        bind: String,
        #[source]
        source: MalformedBindAddress,
    },
}

impl SettingsError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "spark.rpc.settings.read_failed",
            Self::Parse(_) => "spark.rpc.settings.parse_failed",
            Self::EmptyVersion => "spark.rpc.settings.empty_version",
            Self::Bind { .. } => "spark.rpc.settings.invalid_bind",
        }
    }
}
