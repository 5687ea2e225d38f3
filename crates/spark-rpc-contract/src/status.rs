use std::{borrow::Cow, fmt};

use bytes::Bytes;
use thiserror::Error;

/// 标准 RPC 状态码集合，数值与线上约定保持一致（0–16）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// 线上传输使用的数值码。
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// 由数值码还原；未知数值返回 `None`，由调用方决定是否降级为 [`Code::Unknown`]。
    pub const fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Code::Ok,
            1 => Code::Cancelled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            _ => return None,
        })
    }

    /// 规范名称，例如 `INVALID_ARGUMENT`。
    pub const fn as_str(self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态明细：带类型 URL 的不透明载荷，与常见的 `Any` 封装同构。
///
/// 本层从不解码 `value`，只负责原样搬运。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusDetail {
    type_url: Cow<'static, str>,
    value: Bytes,
}

impl StatusDetail {
    pub fn new(type_url: impl Into<Cow<'static, str>>, value: impl Into<Bytes>) -> Self {
        Self {
            type_url: type_url.into(),
            value: value.into(),
        }
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

/// 结构化状态：失败路径上唯一允许返回给远端调用方的产物。
///
/// # 教案式说明
/// - **意图（Why）**：把“对外可见的失败信息”收敛到一个类型上，任何内部错误在跨越进程边界前
///   都必须先转换为 `Status`，从类型层面约束信息泄露面；
/// - **契约（What）**：`code` 为标准状态码；`message` 面向人类阅读；`details` 为零或多条
///   机器可解析明细，顺序即线上顺序；
/// - **执行（How）**：实现 [`std::error::Error`]，可直接作为处理器错误经 `?` 传播，
///   并被 [`crate::RpcError`] 识别为“已归类”错误；
/// - **风险（Trade-offs）**：`message` 由调用方拼装，本类型不做脱敏，脱敏职责在错误规范化拦截器。
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("rpc status {code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
    details: Vec<StatusDetail>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(code: Code, message: impl Into<String>, details: Vec<StatusDetail>) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[StatusDetail] {
        &self.details
    }

    pub fn into_parts(self) -> (Code, String, Vec<StatusDetail>) {
        (self.code, self.message, self.details)
    }
}
