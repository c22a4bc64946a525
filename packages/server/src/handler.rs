//! Handlers: the innermost step of a procedure.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use contour_contract::{Context, RpcError, Value};
use contour_serde::{from_value, to_value};

use crate::Invocation;

/// The body of a procedure. It never receives a continuation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, invocation: Invocation) -> Result<Value, RpcError>;
}

/// A shared handler handle.
pub type HandlerRef = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.as_ref().handle(invocation).await
    }
}

/// A handler backed by an async closure over the whole invocation.
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send,
{
    async fn handle(&self, invocation: Invocation) -> Result<Value, RpcError> {
        (self.f)(invocation).await
    }
}

/// Build a handler from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send,
{
    HandlerFn { f }
}

/// A handler with serde-typed input and output.
pub struct TypedHandler<F, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

#[async_trait]
impl<F, Fut, I, O> Handler for TypedHandler<F, I, O>
where
    F: Fn(Context, I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, RpcError>> + Send,
    I: DeserializeOwned + Send,
    O: Serialize,
{
    async fn handle(&self, invocation: Invocation) -> Result<Value, RpcError> {
        let input: I = from_value(invocation.input)
            .map_err(|e| RpcError::bad_request(format!("cannot decode input: {}", e)))?;
        let output = (self.f)(invocation.context, input).await?;
        to_value(&output).map_err(|e| RpcError::internal(format!("cannot encode output: {}", e)))
    }
}

/// Build a handler that receives the context and a deserialized input.
///
/// ```rust,ignore
/// let get_post = typed_handler(|_ctx: Context, input: GetPost| async move {
///     posts::find(input.id).ok_or_else(|| RpcError::new("POST_NOT_FOUND"))
/// });
/// ```
pub fn typed_handler<F, Fut, I, O>(f: F) -> TypedHandler<F, I, O>
where
    F: Fn(Context, I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, RpcError>> + Send,
    I: DeserializeOwned + Send,
    O: Serialize,
{
    TypedHandler {
        f,
        _marker: PhantomData,
    }
}
