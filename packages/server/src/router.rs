//! Router trees and path resolution.
//!
//! A [`Router`] maps names to nodes. Each node is a bound procedure, a
//! nested router, or a lazy router whose subtree is loaded the first time a
//! call walks through it. Resolution is exact-segment: there is no prefix
//! matching and no wildcard fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use contour_contract::{ConfigError, Path, PathError, RpcError};

use crate::{LazyRouter, Procedure, RouterLoader};

/// An entry of a [`Router`].
#[derive(Clone, Debug)]
pub enum RouterNode {
    Procedure(Arc<Procedure>),
    Router(Router),
    Lazy(LazyRouter),
}

/// A named tree of procedures.
///
/// Immutable once built; cloning shares the tree, including the memo of
/// every lazy node in it.
#[derive(Clone, Debug, Default)]
pub struct Router {
    entries: Arc<BTreeMap<String, RouterNode>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a procedure under `name`.
    pub fn procedure(
        mut self,
        name: impl Into<String>,
        procedure: Procedure,
    ) -> Result<Self, ConfigError> {
        self.insert(name.into(), RouterNode::Procedure(Arc::new(procedure)))?;
        Ok(self)
    }

    /// Nest another router under `name`.
    pub fn router(mut self, name: impl Into<String>, router: Router) -> Result<Self, ConfigError> {
        self.insert(name.into(), RouterNode::Router(router))?;
        Ok(self)
    }

    /// Nest a router that is loaded on first use.
    ///
    /// ```rust,ignore
    /// let app = Router::new()
    ///     .lazy("admin", loader_fn(|| async { Ok(admin::router().into()) }))?;
    /// ```
    pub fn lazy(
        mut self,
        name: impl Into<String>,
        loader: impl RouterLoader + 'static,
    ) -> Result<Self, ConfigError> {
        self.insert(name.into(), RouterNode::Lazy(LazyRouter::new(loader)))?;
        Ok(self)
    }

    pub(crate) fn insert(&mut self, name: String, node: RouterNode) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(PathError::EmptySegment {
                literal: name,
                position: 0,
            }
            .into());
        }
        if self.entries.contains_key(&name) {
            return Err(ConfigError::DuplicateEntry(name));
        }
        Arc::make_mut(&mut self.entries).insert(name, node);
        Ok(())
    }

    /// The node directly under `name`.
    pub fn get(&self, name: &str) -> Option<&RouterNode> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &RouterNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both handles share the same tree.
    pub fn ptr_eq(&self, other: &Router) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Find the procedure at exactly `path`.
    ///
    /// Lazy nodes met along the way are loaded (once) and their router is
    /// searched in their place. A path that ends on a router, runs past a
    /// procedure, or names a missing entry is `NOT_FOUND`. A lazy node that
    /// fails to load reports the loader's error.
    pub async fn resolve(&self, path: &Path) -> Result<Arc<Procedure>, RpcError> {
        let mut current = self;
        let mut segments = path.iter().peekable();

        while let Some(segment) = segments.next() {
            let node = current
                .entries
                .get(segment)
                .ok_or_else(|| RpcError::not_found(path))?;
            let is_last = segments.peek().is_none();

            match node {
                RouterNode::Procedure(procedure) if is_last => return Ok(procedure.clone()),
                RouterNode::Procedure(_) => return Err(RpcError::not_found(path)),
                RouterNode::Router(router) => current = router,
                RouterNode::Lazy(lazy) => {
                    debug!("Resolving lazy router at '{}' for '{}'", segment, path);
                    // The loaded router takes the lazy node's place.
                    current = lazy.load().await?;
                }
            }
        }

        Err(RpcError::not_found(path))
    }

    /// Every procedure reachable without loading anything.
    ///
    /// Lazy nodes that have already loaded are included.
    pub fn procedures(&self) -> Vec<(Path, Arc<Procedure>)> {
        let mut found = Vec::new();
        let mut stack = vec![(Path::root(), self)];
        while let Some((prefix, router)) = stack.pop() {
            for (name, node) in router.entries.iter() {
                let path = prefix.child(name.clone());
                match node {
                    RouterNode::Procedure(procedure) => found.push((path, procedure.clone())),
                    RouterNode::Router(nested) => stack.push((path, nested)),
                    RouterNode::Lazy(lazy) => {
                        if let Some(loaded) = lazy.loaded() {
                            stack.push((path, loaded));
                        }
                    }
                }
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Load every lazy node in the tree and list all procedures.
    pub async fn load_all(&self) -> Result<Vec<(Path, Arc<Procedure>)>, RpcError> {
        let mut found = Vec::new();
        let mut stack = vec![(Path::root(), self.clone())];
        while let Some((prefix, router)) = stack.pop() {
            for (name, node) in router.entries.iter() {
                let path = prefix.child(name.clone());
                match node {
                    RouterNode::Procedure(procedure) => found.push((path, procedure.clone())),
                    RouterNode::Router(nested) => stack.push((path, nested.clone())),
                    RouterNode::Lazy(lazy) => {
                        debug!("Loading lazy router at '{}'", path);
                        let loaded = lazy.load().await?.clone();
                        stack.push((path, loaded));
                    }
                }
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}
