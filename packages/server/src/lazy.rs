//! Lazily loaded router subtrees.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::OnceCell;

use contour_contract::RpcError;

use crate::Router;

/// What a loader produces: a module whose `default` export is the router.
#[derive(Clone, Debug)]
pub struct RouterModule {
    pub default: Router,
}

impl From<Router> for RouterModule {
    fn from(default: Router) -> Self {
        Self { default }
    }
}

/// Produces a router subtree on demand.
#[async_trait]
pub trait RouterLoader: Send + Sync {
    async fn load(&self) -> Result<RouterModule, RpcError>;
}

/// A loader backed by an async closure.
pub struct LoaderFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RouterLoader for LoaderFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RouterModule, RpcError>> + Send,
{
    async fn load(&self) -> Result<RouterModule, RpcError> {
        (self.f)().await
    }
}

/// Build a loader from an async closure.
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RouterModule, RpcError>> + Send,
{
    LoaderFn { f }
}

struct LazyInner {
    loader: Box<dyn RouterLoader>,
    slot: OnceCell<Router>,
}

/// A router subtree that is loaded the first time a call needs it.
///
/// The loaded router is memoized. Concurrent first calls share a single
/// in-flight load. A failed load is reported to every caller waiting on it
/// and leaves nothing cached, so a later call tries again.
///
/// Clones share the memo.
#[derive(Clone)]
pub struct LazyRouter {
    inner: Arc<LazyInner>,
}

impl LazyRouter {
    pub fn new(loader: impl RouterLoader + 'static) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                loader: Box::new(loader),
                slot: OnceCell::new(),
            }),
        }
    }

    /// The loaded router, loading it first if needed.
    pub async fn load(&self) -> Result<&Router, RpcError> {
        self.inner
            .slot
            .get_or_try_init(|| async {
                debug!("Loading lazy router");
                match self.inner.loader.load().await {
                    Ok(module) => Ok(module.default),
                    Err(e) => {
                        warn!("Lazy router failed to load: {}", e);
                        Err(e)
                    }
                }
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.slot.initialized()
    }

    /// The loaded router, if a load has completed.
    pub fn loaded(&self) -> Option<&Router> {
        self.inner.slot.get()
    }

    /// Whether both handles share the same memo.
    pub fn ptr_eq(&self, other: &LazyRouter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LazyRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRouter")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
