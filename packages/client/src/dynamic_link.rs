//! Links that pick their delegate per call.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use contour_contract::{ClientLink, ClientOptions, Context, LinkRef, Path, RpcError, Value};

/// Chooses the link a call is delegated to.
///
/// Resolution is repeated for every call; nothing is cached.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(
        &self,
        path: &Path,
        input: &Value,
        context: &Context,
    ) -> Result<LinkRef, RpcError>;
}

#[async_trait]
impl<R: LinkResolver + ?Sized> LinkResolver for Arc<R> {
    async fn resolve(
        &self,
        path: &Path,
        input: &Value,
        context: &Context,
    ) -> Result<LinkRef, RpcError> {
        self.as_ref().resolve(path, input, context).await
    }
}

/// A resolver that answers synchronously.
pub struct SyncResolver<F> {
    f: F,
}

#[async_trait]
impl<F> LinkResolver for SyncResolver<F>
where
    F: Fn(&Path, &Value, &Context) -> Result<LinkRef, RpcError> + Send + Sync,
{
    async fn resolve(
        &self,
        path: &Path,
        input: &Value,
        context: &Context,
    ) -> Result<LinkRef, RpcError> {
        (self.f)(path, input, context)
    }
}

/// Build a resolver from a plain closure.
pub fn resolve_with<F>(f: F) -> SyncResolver<F>
where
    F: Fn(&Path, &Value, &Context) -> Result<LinkRef, RpcError> + Send + Sync,
{
    SyncResolver { f }
}

/// A resolver that answers asynchronously.
///
/// The closure receives owned copies of the call's path, input and context
/// so the future it returns can outlive the borrow.
pub struct AsyncResolver<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> LinkResolver for AsyncResolver<F>
where
    F: Fn(Path, Value, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LinkRef, RpcError>> + Send,
{
    async fn resolve(
        &self,
        path: &Path,
        input: &Value,
        context: &Context,
    ) -> Result<LinkRef, RpcError> {
        (self.f)(path.clone(), input.clone(), context.clone()).await
    }
}

/// Build a resolver from an async closure.
pub fn resolve_with_async<F, Fut>(f: F) -> AsyncResolver<F>
where
    F: Fn(Path, Value, Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LinkRef, RpcError>> + Send,
{
    AsyncResolver { f }
}

/// Routes calls by the first segment of their path.
///
/// ```rust,ignore
/// let registry = LinkRegistry::new()
///     .register("billing", billing_link)
///     .register("posts", posts_link)
///     .fallback(default_link);
/// let link = DynamicLink::new(registry);
/// ```
#[derive(Clone, Default)]
pub struct LinkRegistry {
    links: BTreeMap<String, LinkRef>,
    fallback: Option<LinkRef>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send calls whose first segment is `segment` to `link`.
    #[must_use]
    pub fn register(mut self, segment: impl Into<String>, link: impl ClientLink + 'static) -> Self {
        self.links.insert(segment.into(), Arc::new(link));
        self
    }

    /// Send calls no registered segment matches to `link`.
    #[must_use]
    pub fn fallback(mut self, link: impl ClientLink + 'static) -> Self {
        self.fallback = Some(Arc::new(link));
        self
    }
}

#[async_trait]
impl LinkResolver for LinkRegistry {
    async fn resolve(
        &self,
        path: &Path,
        _input: &Value,
        _context: &Context,
    ) -> Result<LinkRef, RpcError> {
        path.first()
            .and_then(|segment| self.links.get(segment))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| RpcError::not_found(path))
    }
}

impl std::fmt::Debug for LinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRegistry")
            .field("segments", &self.links.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// A [`ClientLink`] that resolves a concrete link for every call and
/// forwards the call to it unchanged.
///
/// The delegate's result, success or failure, is returned verbatim.
pub struct DynamicLink<R> {
    resolver: R,
}

impl<R: LinkResolver> DynamicLink<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

#[async_trait]
impl<R: LinkResolver> ClientLink for DynamicLink<R> {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        let link = self.resolver.resolve(path, &input, &options.context).await?;
        debug!("Dynamic link resolved a delegate for '{}'", path);
        link.call(path, input, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use contour_contract::{codes, path};

    /// Answers with its own name and counts calls.
    struct Named {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Named {
        fn new(name: &'static str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl ClientLink for Named {
        async fn call(
            &self,
            _path: &Path,
            _input: Value,
            _options: ClientOptions,
        ) -> Result<Value, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from(self.name))
        }
    }

    #[tokio::test]
    async fn dispatches_by_path_without_crossing() {
        let (a, a_calls) = Named::new("a");
        let (b, b_calls) = Named::new("b");
        let a: LinkRef = Arc::new(a);
        let b: LinkRef = Arc::new(b);

        let link = DynamicLink::new(resolve_with(move |path: &Path, _: &Value, _: &Context| {
            match path.first() {
                Some("x") => Ok(a.clone()),
                Some("y") => Ok(b.clone()),
                _ => Err(RpcError::not_found(path)),
            }
        }));

        let out = link
            .call(&path!("x"), Value::Null, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::from("a"));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);

        let out = link
            .call(&path!("y"), Value::Null, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::from("b"));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_resolver_sees_context_and_reresolves() {
        let resolutions = Arc::new(AtomicUsize::new(0));
        let counter = resolutions.clone();
        let (eu, _) = Named::new("eu");
        let (us, _) = Named::new("us");
        let eu: LinkRef = Arc::new(eu);
        let us: LinkRef = Arc::new(us);

        let link = DynamicLink::new(resolve_with_async(
            move |_path: Path, _input: Value, context: Context| {
                counter.fetch_add(1, Ordering::SeqCst);
                let link = match context.get("region").and_then(Value::as_str) {
                    Some("eu") => eu.clone(),
                    _ => us.clone(),
                };
                async move { Ok(link) }
            },
        ));

        let eu_call = ClientOptions::new().with_context(Context::from_entries([("region", "eu")]));
        for _ in 0..2 {
            let out = link
                .call(&path!("posts/list"), Value::Null, eu_call.clone())
                .await
                .unwrap();
            assert_eq!(out, Value::from("eu"));
        }
        let out = link
            .call(&path!("posts/list"), Value::Null, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::from("us"));
        assert_eq!(resolutions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn resolver_failures_are_returned() {
        let link = DynamicLink::new(resolve_with(|_: &Path, _: &Value, _: &Context| {
            Err(RpcError::new(codes::SERVICE_UNAVAILABLE))
        }));
        let err = link
            .call(&path!("x"), Value::Null, ClientOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn registry_routes_by_first_segment() {
        let (billing, _) = Named::new("billing");
        let (default, _) = Named::new("default");
        let link = DynamicLink::new(
            LinkRegistry::new()
                .register("billing", billing)
                .fallback(default),
        );

        let out = link
            .call(&path!("billing/charge"), Value::Null, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::from("billing"));

        let out = link
            .call(&path!("posts/get"), Value::Null, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::from("default"));

        let strict = DynamicLink::new(LinkRegistry::new());
        let err = strict
            .call(&path!("posts/get"), Value::Null, ClientOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::NOT_FOUND);
    }
}
