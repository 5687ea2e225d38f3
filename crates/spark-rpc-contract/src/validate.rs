//! 校验预言机契约。
//!
//! 约束语言与校验引擎均在本仓库之外；这里只定义引擎交回的违规数据形状，
//! 以及拦截器调用引擎的入口 [`Validator`]。

use std::fmt;

use thiserror::Error;

use crate::{error::BoxError, message::StructuredMessage, status::StatusDetail};

/// 完整违规集合明细的类型 URL。
pub const VIOLATIONS_TYPE_URL: &str = "type.googleapis.com/buf.validate.Violations";

/// 字段路径元素上的下标，对应 repeated 下标或 map 键。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subscript {
    Index(u64),
    BoolKey(bool),
    StringKey(String),
    IntKey(i64),
    UintKey(u64),
}

impl fmt::Display for Subscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscript::Index(index) => write!(f, "[{index}]"),
            Subscript::BoolKey(key) => write!(f, "[{key}]"),
            Subscript::StringKey(key) => write!(f, "[{key}]"),
            Subscript::IntKey(key) => write!(f, "[{key}]"),
            Subscript::UintKey(key) => write!(f, "[{key}]"),
        }
    }
}

/// 字段路径中的一段。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPathElement {
    pub name: String,
    pub subscript: Option<Subscript>,
}

impl FieldPathElement {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscript: None,
        }
    }

    pub fn with_subscript(mut self, subscript: Subscript) -> Self {
        self.subscript = Some(subscript);
        self
    }
}

/// 引擎报告的一条约束违规。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field_path: Vec<FieldPathElement>,
    pub message: String,
}

impl Violation {
    pub fn new(field_path: Vec<FieldPathElement>, message: impl Into<String>) -> Self {
        Self {
            field_path,
            message: message.into(),
        }
    }
}

/// 一次校验失败：非空、有序的违规列表，加上完整集合的不透明明细。
///
/// # 教案式说明
/// - **意图（Why）**：状态消息只概括首条违规，机器可读的完整信息依赖 `raw_detail`，
///   两者在构造时一并交付，避免拦截器再去序列化引擎内部类型；
/// - **契约（What）**：`violations` 至少一条，顺序即引擎报告顺序；`raw_detail` 原样附加到状态；
/// - **风险（Trade-offs）**：`raw_detail` 与 `violations` 的一致性由引擎保证，本层不交叉校验。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<Violation>,
    raw_detail: StatusDetail,
}

impl ValidationFailure {
    /// 违规列表为空时返回 `None`。
    pub fn new(violations: Vec<Violation>, raw_detail: StatusDetail) -> Option<Self> {
        if violations.is_empty() {
            return None;
        }
        Some(Self {
            violations,
            raw_detail,
        })
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// 首条违规；构造时已保证存在。
    pub fn first(&self) -> &Violation {
        &self.violations[0]
    }

    pub fn raw_detail(&self) -> &StatusDetail {
        &self.raw_detail
    }
}

/// 校验引擎的失败形态。
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// 消息违反了约束。
    #[error("message failed validation with {} violation(s)", .0.violations().len())]
    Violations(ValidationFailure),

    /// 引擎自身失败（约束编译错误、运行期异常等），不属于调用方数据问题。
    #[error("validation engine failure: {0}")]
    Engine(#[source] BoxError),
}

/// 校验预言机：对结构化消息给出通过或有序违规列表。
///
/// 实现需可被并发调用；拦截器把它当作同步调用。
pub trait Validator: Send + Sync {
    fn validate(&self, message: &dyn StructuredMessage) -> Result<(), ValidatorError>;
}

impl<F> Validator for F
where
    F: Fn(&dyn StructuredMessage) -> Result<(), ValidatorError> + Send + Sync,
{
    fn validate(&self, message: &dyn StructuredMessage) -> Result<(), ValidatorError> {
        self(message)
    }
}
