//! Contract-first implementation: attach handlers to a contract router.

use std::collections::BTreeMap;
use std::sync::Arc;

use contour_contract::{ConfigError, ContractNode, ContractRouter, Path};

use crate::{Handler, Middleware, MiddlewareRef, Procedure, Router, RouterNode};

/// Binds a handler to every procedure of a [`ContractRouter`].
///
/// ```rust,ignore
/// let router = Implementer::new(contract)
///     .middleware(LoggingMiddleware::new())
///     .handler(&path!("posts/getPost"), typed_handler(get_post))?
///     .handler(&path!("posts/listPosts"), typed_handler(list_posts))?
///     .build()?;
/// ```
pub struct Implementer {
    contract: ContractRouter,
    middlewares: Vec<MiddlewareRef>,
    handlers: BTreeMap<Path, Arc<dyn Handler>>,
}

impl Implementer {
    pub fn new(contract: ContractRouter) -> Self {
        Self {
            contract,
            middlewares: Vec::new(),
            handlers: BTreeMap::new(),
        }
    }

    /// Add a middleware shared by every procedure, in declaration order.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Implement the procedure at `path`. Replaces an earlier handler.
    pub fn handler(
        mut self,
        path: &Path,
        handler: impl Handler + 'static,
    ) -> Result<Self, ConfigError> {
        if self.contract.get(path).is_none() {
            return Err(ConfigError::UnknownProcedure(path.clone()));
        }
        self.handlers.insert(path.clone(), Arc::new(handler));
        Ok(self)
    }

    /// Paths declared by the contract that have no handler yet.
    pub fn missing(&self) -> Vec<Path> {
        self.contract
            .procedures()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| !self.handlers.contains_key(path))
            .collect()
    }

    /// Build the router. Fails listing every unimplemented procedure.
    pub fn build(self) -> Result<Router, ConfigError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ConfigError::Unimplemented(missing));
        }
        self.bind(&self.contract, &Path::root())
    }

    fn bind(&self, contract: &ContractRouter, prefix: &Path) -> Result<Router, ConfigError> {
        let mut router = Router::new();
        for (name, node) in contract.entries() {
            let path = prefix.child(name);
            let node = match node {
                ContractNode::Procedure(definition) => {
                    let handler = self
                        .handlers
                        .get(&path)
                        .cloned()
                        .ok_or_else(|| ConfigError::Unimplemented(vec![path.clone()]))?;
                    RouterNode::Procedure(Arc::new(Procedure::new(
                        definition.clone(),
                        self.middlewares.clone(),
                        handler,
                    )))
                }
                ContractNode::Router(nested) => RouterNode::Router(self.bind(nested, &path)?),
            };
            router.insert(name.to_string(), node)?;
        }
        Ok(router)
    }
}
