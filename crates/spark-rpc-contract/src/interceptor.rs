use std::{fmt, future::Future, sync::Arc};

use async_trait::async_trait;

use crate::{context::RpcContext, error::RpcError, message::Payload};

/// 一元调用的结果。
pub type UnaryResult = Result<Payload, RpcError>;

/// 一元调用的终端处理器，即应用代码。
#[async_trait]
pub trait UnaryHandler: Send + Sync {
    async fn call(&self, ctx: RpcContext, request: Payload) -> UnaryResult;
}

/// 包裹一元调用的拦截器。
///
/// # 教案式说明
/// - **意图（Why）**：校验、错误规范化、版本标记都是横切关注点，需要在处理器前后各插一刀，
///   `intercept` 同时拿到请求与“剩余链路”即可表达前置、后置与短路三种行为；
/// - **契约（What）**：
///   - 实现可以不调用 `next` 直接返回（短路），也可以调用恰好一次；
///   - 实现只能读取自身的不可变配置，必须允许任意并发调用；
/// - **执行（How）**：`next` 是按值传入的游标，消费后即不可再用，由类型系统保证“至多一次”。
#[async_trait]
pub trait UnaryInterceptor: Send + Sync {
    async fn intercept(&self, ctx: RpcContext, request: Payload, next: Next<'_>) -> UnaryResult;
}

/// 指向链路剩余部分的游标。
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn UnaryInterceptor>],
    handler: &'a dyn UnaryHandler,
}

impl<'a> Next<'a> {
    pub fn new(interceptors: &'a [Arc<dyn UnaryInterceptor>], handler: &'a dyn UnaryHandler) -> Self {
        Self {
            interceptors,
            handler,
        }
    }

    /// 执行链路剩余部分：先下一个拦截器，链尾为处理器。
    pub async fn run(self, ctx: RpcContext, request: Payload) -> UnaryResult {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                head.intercept(ctx, request, Next::new(rest, self.handler))
                    .await
            }
            None => self.handler.call(ctx, request).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.interceptors.len())
            .finish()
    }
}

/// 有序拦截器链；先注册者位于外层。
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn UnaryInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在当前最内层之内追加一个拦截器。
    #[must_use]
    pub fn layer<I>(mut self, interceptor: I) -> Self
    where
        I: UnaryInterceptor + 'static,
    {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    #[must_use]
    pub fn layer_arc(mut self, interceptor: Arc<dyn UnaryInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// 以给定处理器为链尾执行一次调用。
    pub async fn invoke(
        &self,
        handler: &dyn UnaryHandler,
        ctx: RpcContext,
        request: Payload,
    ) -> UnaryResult {
        Next::new(&self.interceptors, handler).run(ctx, request).await
    }

    /// 把链路与处理器绑定为一个新的处理器。
    pub fn wrap<H>(&self, handler: H) -> InterceptedHandler
    where
        H: UnaryHandler + 'static,
    {
        self.wrap_arc(Arc::new(handler))
    }

    pub fn wrap_arc(&self, handler: Arc<dyn UnaryHandler>) -> InterceptedHandler {
        InterceptedHandler {
            interceptors: self.interceptors.iter().cloned().collect(),
            handler,
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &format!("[{} interceptors]", self.interceptors.len()))
            .finish()
    }
}

/// 绑定了拦截器链的处理器。
#[derive(Clone)]
pub struct InterceptedHandler {
    interceptors: Arc<[Arc<dyn UnaryInterceptor>]>,
    handler: Arc<dyn UnaryHandler>,
}

#[async_trait]
impl UnaryHandler for InterceptedHandler {
    async fn call(&self, ctx: RpcContext, request: Payload) -> UnaryResult {
        Next::new(&self.interceptors, self.handler.as_ref())
            .run(ctx, request)
            .await
    }
}

impl fmt::Debug for InterceptedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedHandler")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// 闭包处理器，见 [`handler_fn`]。
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// 以异步闭包构造处理器。
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RpcContext, Payload) -> Fut + Send + Sync,
    Fut: Future<Output = UnaryResult> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> UnaryHandler for FnHandler<F>
where
    F: Fn(RpcContext, Payload) -> Fut + Send + Sync,
    Fut: Future<Output = UnaryResult> + Send + 'static,
{
    async fn call(&self, ctx: RpcContext, request: Payload) -> UnaryResult {
        (self.f)(ctx, request).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}
