use std::{fmt, sync::Arc};

use async_trait::async_trait;
use spark_rpc_contract::{
    BoxError, Next, Payload, RpcContext, RpcError, RpcMessage, UnaryInterceptor, UnaryResult,
    Validator, ValidatorError,
};
use thiserror::Error;
use tracing::debug;

use crate::violation::{Part, violation_status};

/// 校验拦截器在“无法校验”时返回的未归类错误。
///
/// 两种情形都不是调用方数据的问题，经错误规范化后对外一律表现为 `Internal`。
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 负载不具备结构化视图，通常是处理器注册或消息类型装配错误。
    #[error("{part} is not a structured message")]
    NotAMessage { part: Part },

    /// 校验引擎自身失败。
    #[error("validation engine failed on {part}: {source}")]
    Engine {
        part: Part,
        #[source]
        source: BoxError,
    },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAMessage { .. } => "spark.rpc.validation.not_a_message",
            Self::Engine { .. } => "spark.rpc.validation.engine_failure",
        }
    }
}

/// 构造 [`ValidationInterceptor`] 时的配置错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationConfigError {
    #[error("validation interceptor requires a validator")]
    MissingValidator,
}

impl ValidationConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingValidator => "spark.rpc.validation.missing_validator",
        }
    }
}

/// [`ValidationInterceptor`] 的构造器。
///
/// 默认只校验请求；[`ValidationConfig::with_reply`] 打开响应校验。
#[derive(Clone, Default)]
pub struct ValidationConfig {
    validator: Option<Arc<dyn Validator>>,
    reply: bool,
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时校验处理器返回的响应。
    #[must_use]
    pub fn with_reply(mut self) -> Self {
        self.reply = true;
        self
    }

    #[must_use]
    pub fn with_validator<V>(self, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        self.with_validator_arc(Arc::new(validator))
    }

    #[must_use]
    pub fn with_validator_arc(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<ValidationInterceptor, ValidationConfigError> {
        let validator = self
            .validator
            .ok_or(ValidationConfigError::MissingValidator)?;
        Ok(ValidationInterceptor {
            validator,
            validate_reply: self.reply,
        })
    }
}

impl fmt::Debug for ValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationConfig")
            .field("has_validator", &self.validator.is_some())
            .field("reply", &self.reply)
            .finish()
    }
}

/// 基于约束的请求/响应校验拦截器。
///
/// # 教案式说明
/// - **意图（Why）**：把字段约束检查从每个处理器中抽离，在调用进入业务代码之前统一拒绝
///   不合法的请求；可选地校验响应，防止服务端把违反契约的数据发给客户端；
/// - **契约（What）**：
///   1. 请求不具备结构化视图 → [`ValidationError::NotAMessage`]，处理器不被调用；
///   2. 请求违反约束 → `InvalidArgument` 状态，消息概括首条违规，明细携带完整违规集合，
///      处理器不被调用；
///   3. 处理器返回错误 → 原样透传；
///   4. 开启响应校验且处理器成功 → 对响应执行同样流程，失败码为 `Internal`，响应被丢弃；
/// - **执行（How）**：校验器以 `Arc<dyn Validator>` 共享，拦截器自身不可变，可被任意并发调用；
/// - **风险（Trade-offs）**：校验是同步调用，复杂约束的开销直接计入请求延迟。
#[derive(Clone)]
pub struct ValidationInterceptor {
    validator: Arc<dyn Validator>,
    validate_reply: bool,
}

impl ValidationInterceptor {
    pub fn validates_reply(&self) -> bool {
        self.validate_reply
    }

    fn check(&self, part: Part, payload: &dyn RpcMessage) -> Result<(), RpcError> {
        let Some(message) = payload.structured() else {
            return Err(RpcError::unclassified(ValidationError::NotAMessage { part }));
        };
        match self.validator.validate(message) {
            Ok(()) => Ok(()),
            Err(ValidatorError::Violations(failure)) => {
                debug!(
                    part = %part,
                    message_type = message.full_name(),
                    violations = failure.violations().len(),
                    "message rejected by validator"
                );
                Err(violation_status(part, &failure).into())
            }
            Err(ValidatorError::Engine(source)) => {
                Err(RpcError::unclassified(ValidationError::Engine { part, source }))
            }
        }
    }
}

#[async_trait]
impl UnaryInterceptor for ValidationInterceptor {
    async fn intercept(&self, ctx: RpcContext, request: Payload, next: Next<'_>) -> UnaryResult {
        self.check(Part::Request, request.as_ref())?;

        let reply = next.run(ctx, request).await?;

        if self.validate_reply {
            self.check(Part::Reply, reply.as_ref())?;
        }
        Ok(reply)
    }
}

impl fmt::Debug for ValidationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationInterceptor")
            .field("validate_reply", &self.validate_reply)
            .finish_non_exhaustive()
    }
}
