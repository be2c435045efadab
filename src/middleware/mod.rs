//! Layers that sit between the server and the router.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] with the router at the
//! bottom. Each layer gets the request [`Context`] plus a [`Next`] handle and
//! decides whether, and how, to call further down. The stack this API uses is
//! [`RequestIdMiddleware`], then [`LoggerMiddleware`], then CORS.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::{Request, Response, context::Context};

mod request_id;

pub use request_id::RequestIdMiddleware;

/// Boxed future every middleware and endpoint resolves to.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A middleware erased to a shared closure.
pub type MiddlewareHandler = Arc<dyn Fn(Context, Next) -> ResponseFuture + Send + Sync + 'static>;

/// The innermost layer of a pipeline.
pub type Endpoint = Arc<dyn Fn(Context) -> ResponseFuture + Send + Sync + 'static>;

pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// The rest of the stack below the current layer.
///
/// [`run`](Self::run) takes `self`, so a layer calls down at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Endpoint,
    position: usize,
}

impl Next {
    fn new(middlewares: Arc<[MiddlewareHandler]>, endpoint: Endpoint) -> Self {
        Self {
            middlewares,
            endpoint,
            position: 0,
        }
    }

    /// Hands `ctx` to the next layer, or to the router below the last one.
    pub async fn run(mut self, ctx: Context) -> Response {
        let Some(layer) = self.middlewares.get(self.position).cloned() else {
            return (self.endpoint)(ctx).await;
        };
        self.position += 1;
        layer(ctx, self).await
    }
}

/// One layer of the stack.
///
/// A layer may answer on its own (CORS preflight), or call `next.run(ctx)`
/// and adjust what comes back (request id header). Locks on shared state
/// must not be held across the `.await`.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> ResponseFuture;
}

/// Middleware stack under construction.
///
/// The first layer added is the outermost: it sees the request first and the
/// response last.
///
/// ```no_run
/// use demo_api::middleware::{LoggerMiddleware, Pipeline, RequestIdMiddleware};
/// use demo_api::router::Router;
///
/// let pipeline = Pipeline::new(Router::new())
///     .layer(RequestIdMiddleware)
///     .layer(LoggerMiddleware);
/// ```
pub struct Pipeline {
    middlewares: Vec<MiddlewareHandler>,
    endpoint: Endpoint,
}

impl Pipeline {
    /// Creates a pipeline with no middleware in front of `router`.
    pub fn new(router: crate::router::Router) -> Self {
        let router = Arc::new(router);
        let endpoint: Endpoint = Arc::new(move |ctx| {
            let router = Arc::clone(&router);
            Box::pin(async move { router.dispatch(ctx).await })
        });
        Self {
            middlewares: Vec::new(),
            endpoint,
        }
    }

    /// Appends a middleware to the stack.
    #[must_use]
    pub fn layer<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    /// Number of middleware layers (excluding the endpoint).
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Freezes the stack into a cheaply cloneable service.
    pub fn build(self) -> Service {
        Service {
            middlewares: self.middlewares.into(),
            endpoint: self.endpoint,
        }
    }
}

/// A built [`Pipeline`], shared by every connection task.
#[derive(Clone)]
pub struct Service {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Endpoint,
}

impl Service {
    /// Runs one request through the whole stack.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next::new(Arc::clone(&self.middlewares), Arc::clone(&self.endpoint));
        next.run(Context::new(request)).await
    }
}

/// Access log: one `info` event per request, written once the response is
/// ready. Inside [`RequestIdMiddleware`] the event carries the request id
/// through the enclosing span.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> ResponseFuture {
        Box::pin(async move {
            let started = Instant::now();
            let method = ctx.request().method().clone();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            tracing::info!(
                %method,
                %path,
                status = response.status().as_u16(),
                elapsed = ?started.elapsed(),
                "request completed"
            );
            response
        })
    }
}
