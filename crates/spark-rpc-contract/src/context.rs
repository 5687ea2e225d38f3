use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::metadata::{Metadata, MetadataError, normalize_key};

/// 单次一元调用的上下文。
///
/// # 教案式说明
/// - **意图（Why）**：拦截器与处理器需要共享方法名、入站元数据与出站响应头，
///   上下文把这些调用级信息聚合为一个可廉价克隆的句柄；
/// - **契约（What）**：
///   - `method`：完整方法名，例如 `/demo.v1.Users/Get`，仅用于日志；
///   - `incoming`：传输层解析出的请求元数据，只读；
///   - 出站响应头经 [`RpcContext::set_header`] 追加，传输层在发送前调用
///     [`RpcContext::send_headers`] 封存，封存后的写入返回 [`MetadataError::HeadersSent`]；
/// - **执行（How）**：内部以 `Arc` 共享，出站头由 `parking_lot::Mutex` 保护；
/// - **风险（Trade-offs）**：克隆句柄共享同一份出站头，跨调用复用上下文会造成头部串扰。
#[derive(Clone)]
pub struct RpcContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    method: Cow<'static, str>,
    incoming: Metadata,
    outgoing: Mutex<OutgoingHeaders>,
}

#[derive(Default)]
struct OutgoingHeaders {
    metadata: Metadata,
    sent: bool,
}

impl RpcContext {
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self::with_incoming(method, Metadata::new())
    }

    pub fn with_incoming(method: impl Into<Cow<'static, str>>, incoming: Metadata) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                method: method.into(),
                incoming,
                outgoing: Mutex::new(OutgoingHeaders::default()),
            }),
        }
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn incoming(&self) -> &Metadata {
        &self.inner.incoming
    }

    /// 追加一个出站响应头；多次调用按顺序合并。
    pub fn set_header(&self, key: &str, value: &str) -> Result<(), MetadataError> {
        let mut outgoing = self.inner.outgoing.lock();
        if outgoing.sent {
            return Err(MetadataError::HeadersSent {
                key: normalize_key(key).unwrap_or_else(|_| key.to_owned()),
            });
        }
        outgoing.metadata.append(key, value)
    }

    /// 当前出站响应头的快照。
    pub fn outgoing_headers(&self) -> Metadata {
        self.inner.outgoing.lock().metadata.clone()
    }

    /// 封存并取出出站响应头，供传输层写出；此后 `set_header` 一律失败。
    pub fn send_headers(&self) -> Metadata {
        let mut outgoing = self.inner.outgoing.lock();
        outgoing.sent = true;
        outgoing.metadata.clone()
    }

    pub fn headers_sent(&self) -> bool {
        self.inner.outgoing.lock().sent
    }
}

impl fmt::Debug for RpcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcContext")
            .field("method", &self.inner.method)
            .field("incoming", &self.inner.incoming.len())
            .field("headers_sent", &self.headers_sent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_merge_until_sent() {
        let ctx = RpcContext::new("/demo.v1.Users/Get");
        ctx.set_header("x-version", "1.0.0").expect("first header");
        ctx.set_header("x-request-id", "abc").expect("second header");

        let sent = ctx.send_headers();
        assert_eq!(sent.get("x-version"), Some("1.0.0"));
        assert_eq!(sent.len(), 2);

        let err = ctx.set_header("X-Late", "v").expect_err("headers sealed");
        assert_eq!(
            err,
            MetadataError::HeadersSent {
                key: "x-late".to_owned()
            }
        );
    }

    #[test]
    fn clones_share_outgoing_headers() {
        let ctx = RpcContext::new("/demo.v1.Users/Get");
        let clone = ctx.clone();
        clone.set_header("x-version", "2").expect("set via clone");
        assert_eq!(ctx.outgoing_headers().get("x-version"), Some("2"));
    }
}
