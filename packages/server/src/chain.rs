//! Middleware chain composition.
//!
//! A chain is built once, right to left: the handler is wrapped by the
//! last-declared middleware, that by the one before it, and so on, so the
//! first-declared middleware is the outermost step at run time.

use std::sync::Arc;

use async_trait::async_trait;

use contour_contract::{RpcError, Value};

use crate::{Handler, Invocation, MiddlewareRef, Next};

/// One link of a composed chain.
#[async_trait]
pub(crate) trait Step: Send + Sync {
    async fn run(&self, invocation: Invocation) -> Result<Value, RpcError>;
}

struct HandlerStep {
    handler: Arc<dyn Handler>,
}

#[async_trait]
impl Step for HandlerStep {
    async fn run(&self, invocation: Invocation) -> Result<Value, RpcError> {
        invocation.check_cancelled()?;
        self.handler.handle(invocation).await
    }
}

struct MiddlewareStep {
    middleware: MiddlewareRef,
    inner: Arc<dyn Step>,
}

#[async_trait]
impl Step for MiddlewareStep {
    async fn run(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.middleware
            .handle(Next::new(invocation, self.inner.clone()))
            .await
    }
}

/// An ordered middleware list composed around a handler.
#[derive(Clone)]
pub struct Chain {
    entry: Arc<dyn Step>,
    len: usize,
}

impl Chain {
    pub fn new(middlewares: &[MiddlewareRef], handler: Arc<dyn Handler>) -> Self {
        let innermost: Arc<dyn Step> = Arc::new(HandlerStep { handler });
        let entry = middlewares.iter().rev().fold(innermost, |inner, middleware| {
            Arc::new(MiddlewareStep {
                middleware: middleware.clone(),
                inner,
            }) as Arc<dyn Step>
        });
        Self {
            entry,
            len: middlewares.len(),
        }
    }

    /// Number of middlewares wrapped around the handler.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run the chain from its outermost step.
    pub async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        invocation.check_cancelled()?;
        self.entry.run(invocation).await
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use contour_contract::{codes, path, CancellationSignal, Context, ContextExtension};

    use crate::{handler_fn, middleware_fn};

    fn recorder(
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    ) -> MiddlewareRef {
        Arc::new(middleware_fn(move |next: Next| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("enter {}", name));
                let result = next.proceed().await;
                log.lock().unwrap().push(format!("exit {}", name));
                result
            }
        }))
    }

    fn echo_context(key: &'static str) -> Arc<dyn Handler> {
        Arc::new(handler_fn(move |inv: Invocation| async move {
            Ok(inv.context.get(key).cloned().unwrap_or_default())
        }))
    }

    #[tokio::test]
    async fn first_declared_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = log.clone();
        let handler: Arc<dyn Handler> = Arc::new(handler_fn(move |_inv: Invocation| {
            let log = handler_log.clone();
            async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(Value::Null)
            }
        }));

        let chain = Chain::new(
            &[
                recorder("m1", log.clone()),
                recorder("m2", log.clone()),
                recorder("m3", log.clone()),
            ],
            handler,
        );
        assert_eq!(chain.len(), 3);

        chain
            .invoke(Invocation::new(path!("ping"), Value::Null))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter m1", "enter m2", "enter m3", "handler", "exit m3", "exit m2", "exit m1"]
        );
    }

    #[tokio::test]
    async fn extensions_are_visible_downstream_only() {
        let seen_outside = Arc::new(Mutex::new(None));
        let seen = seen_outside.clone();
        let outer: MiddlewareRef = Arc::new(middleware_fn(move |next: Next| {
            let seen = seen.clone();
            async move {
                let before = next.context().get("db").cloned();
                let result = next.proceed().await;
                *seen.lock().unwrap() = Some(before);
                result
            }
        }));
        let inner: MiddlewareRef = Arc::new(middleware_fn(|next: Next| async move {
            next.run(ContextExtension::new().with("db", "pool-1")).await
        }));

        let chain = Chain::new(&[outer, inner], echo_context("db"));
        let out = chain
            .invoke(Invocation::new(path!("q"), Value::Null))
            .await
            .unwrap();

        assert_eq!(out, Value::from("pool-1"));
        assert_eq!(*seen_outside.lock().unwrap(), Some(None));
    }

    #[tokio::test]
    async fn inner_extension_overrides_outer() {
        let outer: MiddlewareRef = Arc::new(middleware_fn(|next: Next| async move {
            next.run(ContextExtension::new().with("user", "outer")).await
        }));
        let inner: MiddlewareRef = Arc::new(middleware_fn(|next: Next| async move {
            next.run(ContextExtension::new().with("user", "inner")).await
        }));

        let chain = Chain::new(&[outer, inner], echo_context("user"));
        let out = chain
            .invoke(
                Invocation::new(path!("me"), Value::Null)
                    .with_context(Context::from_entries([("user", "caller")])),
            )
            .await
            .unwrap();
        assert_eq!(out, Value::from("inner"));
    }

    #[tokio::test]
    async fn short_circuit_skips_the_handler() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_handler = ran.clone();
        let handler: Arc<dyn Handler> = Arc::new(handler_fn(move |_inv: Invocation| {
            let ran = ran_in_handler.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        }));
        let deny: MiddlewareRef = Arc::new(middleware_fn(|_next: Next| async move {
            Err(RpcError::new(codes::UNAUTHORIZED))
        }));

        let err = Chain::new(&[deny], handler)
            .invoke(Invocation::new(path!("secret"), Value::Null))
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::UNAUTHORIZED);
        assert_eq!(err.status(), 401);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn middleware_can_replace_output() {
        let wrap: MiddlewareRef = Arc::new(middleware_fn(|next: Next| async move {
            let out = next.proceed().await?;
            Ok(Value::map().with("wrapped", out))
        }));
        let out = Chain::new(&[wrap], echo_context("missing"))
            .invoke(Invocation::new(path!("x"), Value::Null))
            .await
            .unwrap();
        assert_eq!(out.get("wrapped"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn cancellation_between_steps() {
        let signal = CancellationSignal::new();
        let cancelling = signal.clone();
        let cancel: MiddlewareRef = Arc::new(middleware_fn(move |next: Next| {
            let signal = cancelling.clone();
            async move {
                signal.cancel();
                next.proceed().await
            }
        }));

        let err = Chain::new(&[cancel], echo_context("x"))
            .invoke(Invocation::new(path!("x"), Value::Null).with_signal(signal))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_never_enters() {
        let signal = CancellationSignal::new();
        signal.cancel();
        let log = Arc::new(Mutex::new(Vec::new()));

        let err = Chain::new(&[recorder("m1", log.clone())], echo_context("x"))
            .invoke(Invocation::new(path!("x"), Value::Null).with_signal(signal))
            .await
            .unwrap_err();

        assert_eq!(err.code(), codes::CANCELLED);
        assert!(log.lock().unwrap().is_empty());
    }
}
