use std::{fmt, sync::Arc};

use async_trait::async_trait;
use spark_rpc_contract::{
    Code, ErrorLogger, LogField, Next, Payload, RpcContext, RpcError, Status, UnaryInterceptor,
    UnaryResult,
};

/// 隐藏内部错误时写入日志的消息。
pub const HIDDEN_ERROR_LOG_MESSAGE: &str = "hiding unhandled error";

/// 未归类错误对外呈现的固定消息。
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Error";

/// 日志字段：源错误的类型名。
pub const FIELD_ERROR_TYPE: &str = "errorType";

/// 日志字段：源错误的展示文本。
pub const FIELD_ERROR: &str = "error";

/// 错误规范化拦截器：保证远端只会看到结构化状态。
///
/// # 教案式说明
/// - **意图（Why）**：处理器中任何未经归类的错误（数据库驱动、IO、第三方库）都可能在消息里
///   携带内部细节，必须在出进程前统一替换为不含信息的 `Internal`；
/// - **契约（What）**：
///   - 成功响应与 [`RpcError::Status`] 原样透传，状态的码、消息与明细均不改动；
///   - [`RpcError::Unclassified`] 先交给可选的 [`ErrorLogger`] 记录
///     （`errorType` 为源类型名，`error` 为展示文本），再替换为
///     `Status { Internal, "Internal Error" }`，不带明细；
///   - 未注入日志汇时只是不记录，规范化行为不变；
/// - **执行（How）**：应位于链路最外层，覆盖内层所有拦截器与处理器产生的错误；
/// - **风险（Trade-offs）**：完整错误只存在于服务端日志，排障依赖日志与调用方法名的关联。
#[derive(Clone, Default)]
pub struct ErrorNormalizationInterceptor {
    logger: Option<Arc<dyn ErrorLogger>>,
}

impl ErrorNormalizationInterceptor {
    pub fn new(logger: Option<Arc<dyn ErrorLogger>>) -> Self {
        Self { logger }
    }

    pub fn with_logger<L>(logger: L) -> Self
    where
        L: ErrorLogger + 'static,
    {
        let logger: Arc<dyn ErrorLogger> = Arc::new(logger);
        Self::new(Some(logger))
    }

    /// 把一个处理器错误规范化为对外可见的状态。
    pub fn normalize(&self, ctx: &RpcContext, error: RpcError) -> Status {
        match error {
            RpcError::Status(status) => status,
            RpcError::Unclassified { kind, source } => {
                if let Some(logger) = &self.logger {
                    let rendered = source.to_string();
                    logger.error_with_context(
                        ctx,
                        HIDDEN_ERROR_LOG_MESSAGE,
                        &[
                            LogField::new(FIELD_ERROR_TYPE, kind),
                            LogField::new(FIELD_ERROR, &rendered),
                        ],
                    );
                }
                Status::new(Code::Internal, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

#[async_trait]
impl UnaryInterceptor for ErrorNormalizationInterceptor {
    async fn intercept(&self, ctx: RpcContext, request: Payload, next: Next<'_>) -> UnaryResult {
        match next.run(ctx.clone(), request).await {
            Ok(reply) => Ok(reply),
            Err(error) => Err(self.normalize(&ctx, error).into()),
        }
    }
}

impl fmt::Debug for ErrorNormalizationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNormalizationInterceptor")
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}

/// 把自校验消息报告的错误包装为 `InvalidArgument` 状态，消息即错误文本。
///
/// 适用于消息类型自带 `validate()` 一类方法、不经过约束引擎的场景。
pub fn validation_error_status<E>(error: &E) -> Status
where
    E: fmt::Display + ?Sized,
{
    Status::invalid_argument(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use spark_rpc_contract::{InterceptorChain, RpcMessage, StatusDetail, handler_fn};
    use thiserror::Error;

    #[derive(Debug)]
    struct Empty;

    impl RpcMessage for Empty {}

    #[derive(Debug, Error)]
    #[error("connection refused: db-primary.internal:5432")]
    struct DbUnreachable;

    type Record = (String, String, Vec<(String, String)>);

    #[derive(Default)]
    struct RecordingLogger {
        records: Mutex<Vec<Record>>,
    }

    impl ErrorLogger for RecordingLogger {
        fn error_with_context(&self, ctx: &RpcContext, message: &str, fields: &[LogField<'_>]) {
            self.records.lock().push((
                ctx.method().to_owned(),
                message.to_owned(),
                fields
                    .iter()
                    .map(|field| (field.key.to_owned(), field.value.to_owned()))
                    .collect(),
            ));
        }
    }

    async fn run(
        interceptor: ErrorNormalizationInterceptor,
        outcome: fn() -> UnaryResult,
    ) -> UnaryResult {
        let handler = handler_fn(move |_ctx, _request| async move { outcome() });
        InterceptorChain::new()
            .layer(interceptor)
            .invoke(&handler, RpcContext::new("/acct.v1.Ledger/Post"), Box::new(Empty))
            .await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unclassified_errors_are_hidden_and_logged() {
        let logger = Arc::new(RecordingLogger::default());
        let shared: Arc<dyn ErrorLogger> = logger.clone();
        let interceptor = ErrorNormalizationInterceptor::new(Some(shared));

        let err = run(interceptor, || Err(RpcError::unclassified(DbUnreachable)))
            .await
            .expect_err("normalized");

        assert_eq!(err.status(), Some(&Status::new(Code::Internal, "Internal Error")));
        assert!(err.status().is_some_and(|status| status.details().is_empty()));

        let records = logger.records.lock();
        assert_eq!(records.len(), 1);
        let (method, message, fields) = &records[0];
        assert_eq!(method, "/acct.v1.Ledger/Post");
        assert_eq!(message, HIDDEN_ERROR_LOG_MESSAGE);
        assert_eq!(fields[0].0, FIELD_ERROR_TYPE);
        assert!(fields[0].1.ends_with("DbUnreachable"), "errorType was {}", fields[0].1);
        assert_eq!(
            fields[1],
            (
                FIELD_ERROR.to_owned(),
                "connection refused: db-primary.internal:5432".to_owned()
            )
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_errors_pass_through_unchanged() {
        let logger = Arc::new(RecordingLogger::default());
        let shared: Arc<dyn ErrorLogger> = logger.clone();
        let interceptor = ErrorNormalizationInterceptor::new(Some(shared));

        let err = run(interceptor, || {
            Err(Status::with_details(
                Code::FailedPrecondition,
                "account frozen",
                vec![StatusDetail::new("type.example/acct.Frozen", &b"\x08\x01"[..])],
            )
            .into())
        })
        .await
        .expect_err("status error");

        let status = err.status().expect("status preserved");
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert_eq!(status.message(), "account frozen");
        assert_eq!(status.details().len(), 1);
        assert!(logger.records.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn anyhow_wrapped_status_is_not_hidden() {
        let err = run(ErrorNormalizationInterceptor::default(), || {
            let inner: anyhow::Error = Status::new(Code::NotFound, "no ledger").into();
            Err(inner.context("posting entry").into())
        })
        .await
        .expect_err("status error");
        assert_eq!(err.status().map(Status::code), Some(Code::NotFound));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_logger_only_suppresses_logging() {
        let err = run(ErrorNormalizationInterceptor::default(), || {
            Err(anyhow::anyhow!("secret token abc123 rejected").into())
        })
        .await
        .expect_err("normalized");
        let status = err.status().expect("status");
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn success_passes_through() {
        let logger = Arc::new(RecordingLogger::default());
        let shared: Arc<dyn ErrorLogger> = logger.clone();
        let reply = run(ErrorNormalizationInterceptor::new(Some(shared)), || Ok(Box::new(Empty)))
            .await
            .expect("success");
        assert!(reply.downcast_ref::<Empty>().is_some());
        assert!(logger.records.lock().is_empty());
    }

    #[test]
    fn self_validation_errors_become_invalid_argument() {
        let status = validation_error_status("name: must not be empty");
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "name: must not be empty");
    }
}
