//! Trees of procedure definitions, for contract-first implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{ConfigError, ContractProcedure, Path, PathError, Value};

/// An entry of a [`ContractRouter`].
#[derive(Clone, Debug)]
pub enum ContractNode {
    Procedure(Arc<ContractProcedure>),
    Router(ContractRouter),
}

/// A named tree of procedure definitions with no handlers attached.
///
/// A server implements it with `contour_server::Implementer`; a client can
/// walk it to learn which paths exist.
#[derive(Clone, Debug, Default)]
pub struct ContractRouter {
    entries: BTreeMap<String, ContractNode>,
}

impl ContractRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a procedure definition under `name`.
    pub fn procedure(
        mut self,
        name: impl Into<String>,
        contract: ContractProcedure,
    ) -> Result<Self, ConfigError> {
        self.insert(name.into(), ContractNode::Procedure(Arc::new(contract)))?;
        Ok(self)
    }

    /// Nest another contract router under `name`.
    pub fn router(
        mut self,
        name: impl Into<String>,
        router: ContractRouter,
    ) -> Result<Self, ConfigError> {
        self.insert(name.into(), ContractNode::Router(router))?;
        Ok(self)
    }

    fn insert(&mut self, name: String, node: ContractNode) -> Result<(), ConfigError> {
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
        self.entries.insert(name, node);
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ContractNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Find the definition at exactly `path`.
    pub fn get(&self, path: &Path) -> Option<&Arc<ContractProcedure>> {
        let (last, parents) = path.segments.split_last()?;
        let mut current = self;
        for segment in parents {
            match current.entries.get(segment)? {
                ContractNode::Router(router) => current = router,
                ContractNode::Procedure(_) => return None,
            }
        }
        match current.entries.get(last)? {
            ContractNode::Procedure(contract) => Some(contract),
            ContractNode::Router(_) => None,
        }
    }

    /// Every procedure path with its definition, depth first in key order.
    pub fn procedures(&self) -> Vec<(Path, Arc<ContractProcedure>)> {
        let mut found = Vec::new();
        self.collect(&Path::root(), &mut found);
        found
    }

    fn collect(&self, prefix: &Path, found: &mut Vec<(Path, Arc<ContractProcedure>)>) {
        for (name, node) in &self.entries {
            let path = prefix.child(name.clone());
            match node {
                ContractNode::Procedure(contract) => found.push((path, contract.clone())),
                ContractNode::Router(router) => router.collect(&path, found),
            }
        }
    }

    /// Nested structural records of every definition.
    pub fn describe(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(name, node)| {
                    let value = match node {
                        ContractNode::Procedure(contract) => contract.describe(),
                        ContractNode::Router(router) => router.describe(),
                    };
                    (name.clone(), value)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{is_contract_procedure, path};

    fn contract() -> ContractProcedure {
        ContractProcedure::builder().build().unwrap()
    }

    fn blog() -> ContractRouter {
        ContractRouter::new()
            .procedure("health", contract())
            .unwrap()
            .router(
                "posts",
                ContractRouter::new()
                    .procedure("getPost", contract())
                    .unwrap()
                    .procedure("listPosts", contract())
                    .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = ContractRouter::new().procedure("", contract()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Path(PathError::EmptySegment { position: 0, .. })
        ));
        assert!(ContractRouter::new()
            .router("", ContractRouter::new())
            .is_err());
    }

    #[test]
    fn lookup_is_exact() {
        let router = blog();
        assert!(router.get(&path!("posts/getPost")).is_some());
        assert!(router.get(&path!("posts")).is_none());
        assert!(router.get(&path!("posts/getPost/extra")).is_none());
        assert!(router.get(&Path::root()).is_none());
    }

    #[test]
    fn lists_all_procedures() {
        let paths: Vec<Path> = blog().procedures().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![path!("health"), path!("posts/getPost"), path!("posts/listPosts")]
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ContractRouter::new()
            .procedure("a", contract())
            .unwrap()
            .router("a", ContractRouter::new())
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateEntry("a".to_string()));
    }

    #[test]
    fn describe_nests_records() {
        let record = blog().describe();
        let get_post = record.get("posts").and_then(|p| p.get("getPost")).unwrap();
        assert!(is_contract_procedure(get_post));
        assert!(!is_contract_procedure(record.get("posts").unwrap()));
    }
}
