//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 处理器代码返回的错误在这里被二分：已携带状态码的 [`Status`] 与未归类的任意错误；
//! - 未归类错误保留原始类型名与错误链，仅供日志使用，永远不应原样返回给远端。
//!
//! ## 设计要求（What）
//! - 所有构造入口都会尝试从装箱错误或 `anyhow::Error` 中找回 [`Status`]，
//!   包括经 `source()` 链包装的状态，确保“已归类”判断与错误包装方式无关。

use std::any::type_name;

use thiserror::Error;

use crate::status::Status;

/// 可跨线程传播的装箱错误。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 一元处理器与拦截器链返回的错误。
///
/// # 教案式说明
/// - **意图（Why）**：错误规范化拦截器需要区分“应用层显式构造的状态”与“意外泄露的内部错误”，
///   枚举把这个区分提升为类型信息；
/// - **契约（What）**：
///   - `Status`：可原样透传给远端；
///   - `Unclassified`：`kind` 为源错误的 Rust 类型名，`source` 为完整错误链；
/// - **风险（Trade-offs）**：`kind` 取自泛型参数的静态类型，对装箱错误只能记录装箱类型本身。
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Status(#[from] Status),

    #[error("{source}")]
    Unclassified {
        kind: &'static str,
        #[source]
        source: BoxError,
    },
}

impl RpcError {
    /// 包装任意错误；若其本身就是 [`Status`]，仍然归入 `Status` 分支。
    pub fn unclassified<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_boxed_with_kind(Box::new(error), type_name::<E>())
    }

    /// 从装箱错误构造，尝试向下转型找回 [`Status`]。
    pub fn from_boxed(error: BoxError) -> Self {
        Self::from_boxed_with_kind(error, type_name::<BoxError>())
    }

    fn from_boxed_with_kind(error: BoxError, kind: &'static str) -> Self {
        match error.downcast::<Status>() {
            Ok(status) => Self::Status(*status),
            Err(source) => match wrapped_status(source.as_ref()).cloned() {
                Some(status) => Self::Status(status),
                None => Self::Unclassified { kind, source },
            },
        }
    }

    /// 已携带状态码时返回对应状态。
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            Self::Unclassified { .. } => None,
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status(_))
    }

    /// 未归类错误的源类型名。
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Status(_) => None,
            Self::Unclassified { kind, .. } => Some(kind),
        }
    }
}

impl From<anyhow::Error> for RpcError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<Status>() {
            Ok(status) => Self::Status(status),
            Err(error) => {
                let wrapped = error
                    .chain()
                    .find_map(|cause| cause.downcast_ref::<Status>())
                    .cloned();
                match wrapped {
                    Some(status) => Self::Status(status),
                    None => Self::Unclassified {
                        kind: type_name::<anyhow::Error>(),
                        source: error.into(),
                    },
                }
            }
        }
    }
}

/// 沿 `source()` 链查找被包装的 [`Status`]，不含链首本身。
fn wrapped_status<'a>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a Status> {
    let mut cause = error.source();
    while let Some(current) = cause {
        if let Some(status) = current.downcast_ref::<Status>() {
            return Some(status);
        }
        cause = current.source();
    }
    None
}
