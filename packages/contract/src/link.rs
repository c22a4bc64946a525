//! The transport contract every call is dispatched through.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{CancellationSignal, Context, Path, RpcError, Value};

/// Per-call options.
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    /// Caller-supplied context. Empty when not given.
    pub context: Context,
    /// Cooperative cancellation for the call.
    pub signal: Option<CancellationSignal>,
    /// Replaces the call path when the target is addressed dynamically.
    pub path: Option<Path>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
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

    #[must_use]
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = Some(path);
        self
    }

    /// The path a link should address: the override if set, else `path`.
    pub fn target<'a>(&'a self, path: &'a Path) -> &'a Path {
        self.path.as_ref().unwrap_or(path)
    }

    /// Fail with `CANCELLED` if the call's signal has fired.
    pub fn check_cancelled(&self) -> Result<(), RpcError> {
        match &self.signal {
            Some(signal) => signal.check(),
            None => Ok(()),
        }
    }
}

/// A transport endpoint.
///
/// A link accepts a path, an input and call options and produces the
/// procedure's output or a typed error. It holds no per-call state.
///
/// # Object Safety
///
/// This trait is object-safe: links are usually shared as
/// `Arc<dyn ClientLink>`.
#[async_trait]
pub trait ClientLink: Send + Sync {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError>;
}

/// A shared link handle.
pub type LinkRef = Arc<dyn ClientLink>;

// Blanket implementations for shared pointers and references

#[async_trait]
impl<T: ClientLink + ?Sized> ClientLink for Arc<T> {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        self.as_ref().call(path, input, options).await
    }
}

#[async_trait]
impl<T: ClientLink + ?Sized> ClientLink for Box<T> {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        self.as_ref().call(path, input, options).await
    }
}

#[async_trait]
impl<T: ClientLink + ?Sized> ClientLink for &T {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        (**self).call(path, input, options).await
    }
}
