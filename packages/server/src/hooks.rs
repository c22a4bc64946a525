//! Interceptor hooks: middleware that observes a call without altering it.

use async_trait::async_trait;

use contour_contract::{Context, Path, RpcError, Value};

use crate::{Middleware, Next};

/// Runs `f` before the rest of the chain.
pub struct OnStart<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for OnStart<F>
where
    F: Fn(&Path, &Context) + Send + Sync,
{
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        (self.f)(next.path(), next.context());
        next.proceed().await
    }
}

pub fn on_start<F>(f: F) -> OnStart<F>
where
    F: Fn(&Path, &Context) + Send + Sync,
{
    OnStart { f }
}

/// Runs `f` with the output when the rest of the chain succeeds.
pub struct OnSuccess<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for OnSuccess<F>
where
    F: Fn(&Path, &Value) + Send + Sync,
{
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        let path = next.path().clone();
        let result = next.proceed().await;
        if let Ok(output) = &result {
            (self.f)(&path, output);
        }
        result
    }
}

pub fn on_success<F>(f: F) -> OnSuccess<F>
where
    F: Fn(&Path, &Value) + Send + Sync,
{
    OnSuccess { f }
}

/// Runs `f` with the error when the rest of the chain fails.
pub struct OnError<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for OnError<F>
where
    F: Fn(&Path, &RpcError) + Send + Sync,
{
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        let path = next.path().clone();
        let result = next.proceed().await;
        if let Err(error) = &result {
            (self.f)(&path, error);
        }
        result
    }
}

pub fn on_error<F>(f: F) -> OnError<F>
where
    F: Fn(&Path, &RpcError) + Send + Sync,
{
    OnError { f }
}

/// Runs `f` with the outcome, whichever it is.
pub struct OnFinish<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for OnFinish<F>
where
    F: Fn(&Path, Result<&Value, &RpcError>) + Send + Sync,
{
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        let path = next.path().clone();
        let result = next.proceed().await;
        (self.f)(&path, result.as_ref());
        result
    }
}

pub fn on_finish<F>(f: F) -> OnFinish<F>
where
    F: Fn(&Path, Result<&Value, &RpcError>) + Send + Sync,
{
    OnFinish { f }
}
