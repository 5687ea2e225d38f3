use std::{fmt, sync::Arc};

use spark_rpc_contract::{ErrorLogger, InterceptorChain, UnaryHandler, Validator};
use spark_rpc_middleware::{
    ErrorNormalizationInterceptor, TracingErrorLogger, ValidationConfig, ValidationConfigError,
    VersionInterceptor,
};
use thiserror::Error;

use crate::settings::EdgeSettings;

/// 装配拦截器链失败。
#[derive(Debug, Error)]
pub enum PipelineBuildError {
    #[error("edge pipeline requires a service version")]
    MissingVersion,

    #[error(transparent)]
    Validation(#[from] ValidationConfigError),
}

impl PipelineBuildError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingVersion => "spark.rpc.pipeline.missing_version",
            Self::Validation(err) => err.code(),
        }
    }
}

/// 边界层拦截器链：错误规范化 → 版本标记 → 校验 → 处理器。
///
/// # 教案式说明
/// - **意图（Why）**：三个拦截器的相对顺序决定了语义（例如校验产生的未归类错误必须被规范化，
///   被拒绝的请求也要带版本头），由装配器固定顺序，业务方只提供依赖；
/// - **契约（What）**：
///   - 校验器与版本号必填，缺失时 [`EdgePipelineBuilder::build`] 返回错误而不是 panic；
///   - 未提供日志汇时使用 [`TracingErrorLogger`]；
///   - [`EdgePipeline::wrap`] 返回的处理器可被任意并发调用；
/// - **风险（Trade-offs）**：需要额外拦截器时应在 [`EdgePipeline::chain`] 的基础上自行扩展，
///   装配器不提供插入点。
#[derive(Clone)]
pub struct EdgePipeline {
    chain: InterceptorChain,
    version: Arc<str>,
    validate_reply: bool,
}

impl EdgePipeline {
    pub fn builder() -> EdgePipelineBuilder {
        EdgePipelineBuilder::default()
    }

    /// 以配置中的版本号与响应校验开关预填构造器。
    pub fn builder_from_settings(settings: &EdgeSettings) -> EdgePipelineBuilder {
        Self::builder()
            .version(settings.version.clone())
            .validate_reply(settings.validate_reply)
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn validates_reply(&self) -> bool {
        self.validate_reply
    }

    /// 把链路套在处理器外层。
    pub fn wrap<H>(&self, handler: H) -> Arc<dyn UnaryHandler>
    where
        H: UnaryHandler + 'static,
    {
        Arc::new(self.chain.wrap(handler))
    }
}

impl fmt::Debug for EdgePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgePipeline")
            .field("version", &self.version)
            .field("validate_reply", &self.validate_reply)
            .field("interceptors", &self.chain.len())
            .finish()
    }
}

/// [`EdgePipeline`] 构造器。
#[derive(Default)]
pub struct EdgePipelineBuilder {
    validator: Option<Arc<dyn Validator>>,
    logger: Option<Arc<dyn ErrorLogger>>,
    version: Option<String>,
    validate_reply: bool,
}

impl EdgePipelineBuilder {
    #[must_use]
    pub fn validator<V>(self, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        self.validator_arc(Arc::new(validator))
    }

    #[must_use]
    pub fn validator_arc(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn logger<L>(self, logger: L) -> Self
    where
        L: ErrorLogger + 'static,
    {
        self.logger_arc(Arc::new(logger))
    }

    #[must_use]
    pub fn logger_arc(mut self, logger: Arc<dyn ErrorLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn validate_reply(mut self, enabled: bool) -> Self {
        self.validate_reply = enabled;
        self
    }

    pub fn build(self) -> Result<EdgePipeline, PipelineBuildError> {
        let version: Arc<str> = match self.version {
            Some(version) if !version.trim().is_empty() => version.into(),
            _ => return Err(PipelineBuildError::MissingVersion),
        };

        let mut validation = ValidationConfig::new();
        if self.validate_reply {
            validation = validation.with_reply();
        }
        if let Some(validator) = self.validator {
            validation = validation.with_validator_arc(validator);
        }
        let validation = validation.build()?;

        let logger: Arc<dyn ErrorLogger> = match self.logger {
            Some(logger) => logger,
            None => Arc::new(TracingErrorLogger),
        };

        let chain = InterceptorChain::new()
            .layer(ErrorNormalizationInterceptor::new(Some(logger)))
            .layer(VersionInterceptor::new(Arc::clone(&version)))
            .layer(validation);

        Ok(EdgePipeline {
            chain,
            version,
            validate_reply: self.validate_reply,
        })
    }
}

impl fmt::Debug for EdgePipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgePipelineBuilder")
            .field("has_validator", &self.validator.is_some())
            .field("has_logger", &self.logger.is_some())
            .field("version", &self.version)
            .field("validate_reply", &self.validate_reply)
            .finish()
    }
}
