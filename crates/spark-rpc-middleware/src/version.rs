use std::sync::Arc;

use async_trait::async_trait;
use spark_rpc_contract::{Next, Payload, RpcContext, RpcError, UnaryInterceptor, UnaryResult};

/// 携带服务版本的出站响应头。
pub const VERSION_HEADER: &str = "x-version";

/// 在每个响应上标记服务版本。
///
/// 处理器之前写入 `x-version` 响应头，因此成功与失败的响应都会带上它；
/// 写入被拒绝（值非法或响应头已发送）时以未归类错误返回，处理器不会被调用。
#[derive(Clone, Debug)]
pub struct VersionInterceptor {
    version: Arc<str>,
}

impl VersionInterceptor {
    pub fn new(version: impl Into<Arc<str>>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

#[async_trait]
impl UnaryInterceptor for VersionInterceptor {
    async fn intercept(&self, ctx: RpcContext, request: Payload, next: Next<'_>) -> UnaryResult {
        ctx.set_header(VERSION_HEADER, &self.version)
            .map_err(RpcError::unclassified)?;
        next.run(ctx, request).await
    }
}
