//! Middleware: interceptors wrapped around a procedure's handler.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use contour_contract::{CancellationSignal, Context, ContextExtension, Path, RpcError, Value};

use crate::chain::Step;

/// Everything a step of a call can see.
#[derive(Clone, Debug, Default)]
pub struct Invocation {
    pub context: Context,
    pub path: Path,
    pub input: Value,
    pub signal: Option<CancellationSignal>,
}

impl Invocation {
    pub fn new(path: Path, input: Value) -> Self {
        Self {
            path,
            input,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Fail with `CANCELLED` if the call's signal has fired.
    pub fn check_cancelled(&self) -> Result<(), RpcError> {
        match &self.signal {
            Some(signal) => signal.check(),
            None => Ok(()),
        }
    }
}

/// The rest of the chain, as seen from one middleware.
///
/// `run` consumes the continuation, so a middleware advances the chain at
/// most once. Dropping it without calling `run` short-circuits: nothing
/// nested inside the middleware executes.
pub struct Next {
    invocation: Invocation,
    inner: Arc<dyn Step>,
}

impl Next {
    pub(crate) fn new(invocation: Invocation, inner: Arc<dyn Step>) -> Self {
        Self { invocation, inner }
    }

    /// The context this middleware was entered with.
    pub fn context(&self) -> &Context {
        &self.invocation.context
    }

    pub fn path(&self) -> &Path {
        &self.invocation.path
    }

    pub fn input(&self) -> &Value {
        &self.invocation.input
    }

    pub fn signal(&self) -> Option<&CancellationSignal> {
        self.invocation.signal.as_ref()
    }

    /// Continue the chain with `extension` merged into the context.
    ///
    /// The merged context is visible to every step nested inside this
    /// middleware and to nothing outside it.
    pub async fn run(self, extension: ContextExtension) -> Result<Value, RpcError> {
        let Next {
            mut invocation,
            inner,
        } = self;
        invocation.context = invocation.context.extend(extension);
        invocation.check_cancelled()?;
        inner.run(invocation).await
    }

    /// Continue the chain without extending the context.
    pub async fn proceed(self) -> Result<Value, RpcError> {
        self.run(ContextExtension::new()).await
    }
}

/// An interceptor around a procedure's handler.
///
/// A middleware either advances the chain through [`Next::run`] (and may
/// then observe or replace the result), or finishes the call itself by
/// returning an output or an error without touching `next`.
///
/// # Object Safety
///
/// This trait is object-safe: chains hold `Arc<dyn Middleware>`.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, next: Next) -> Result<Value, RpcError>;
}

/// A shared middleware handle.
pub type MiddlewareRef = Arc<dyn Middleware>;

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        self.as_ref().handle(next).await
    }
}

/// A middleware backed by an async closure.
pub struct MiddlewareFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send,
{
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        (self.f)(next).await
    }
}

/// Build a middleware from an async closure.
///
/// ```rust,ignore
/// let auth = middleware_fn(|next: Next| async move {
///     let Some(token) = next.context().get("token").cloned() else {
///         return Err(RpcError::new(codes::UNAUTHORIZED));
///     };
///     next.run(ContextExtension::new().with("user", lookup(token)?)).await
/// });
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send,
{
    MiddlewareFn { f }
}
