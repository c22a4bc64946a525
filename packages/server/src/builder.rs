//! Fluent construction of bound procedures.

use std::sync::Arc;

use contour_contract::{
    ConfigError, ContractProcedure, ContractProcedureBuilder, ErrorMap, ErrorSpec, RouteOptions,
    Schema, Value,
};

use crate::{Handler, Middleware, MiddlewareRef, Procedure};

/// Builder for a [`Procedure`].
///
/// Middlewares run in the order they are added. Cloning a partially
/// configured builder is the way to share a base (for instance an auth
/// middleware) between procedures.
///
/// ```rust,ignore
/// let authed = ProcedureBuilder::new().middleware(auth);
///
/// let get_post = authed
///     .clone()
///     .input(SerdeSchema::<GetPost>::new())
///     .error("POST_NOT_FOUND", ErrorSpec::new(404))
///     .handler(typed_handler(get_post))?;
/// ```
#[derive(Clone, Default)]
pub struct ProcedureBuilder {
    contract: ContractProcedureBuilder,
    middlewares: Vec<MiddlewareRef>,
}

impl ProcedureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn middleware_ref(mut self, middleware: MiddlewareRef) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Start from an existing definition. Later calls refine it.
    #[must_use]
    pub fn contract(mut self, contract: ContractProcedure) -> Self {
        self.contract = contract.into();
        self
    }

    #[must_use]
    pub fn route(mut self, route: RouteOptions) -> Self {
        self.contract = self.contract.route(route);
        self
    }

    #[must_use]
    pub fn input(mut self, schema: impl Schema + 'static) -> Self {
        self.contract = self.contract.input(schema);
        self
    }

    #[must_use]
    pub fn output(mut self, schema: impl Schema + 'static) -> Self {
        self.contract = self.contract.output(schema);
        self
    }

    #[must_use]
    pub fn error(mut self, code: impl Into<String>, spec: ErrorSpec) -> Self {
        self.contract = self.contract.error(code, spec);
        self
    }

    #[must_use]
    pub fn errors(mut self, errors: ErrorMap) -> Self {
        self.contract = self.contract.errors(errors);
        self
    }

    #[must_use]
    pub fn input_example(mut self, example: impl Into<Value>) -> Self {
        self.contract = self.contract.input_example(example);
        self
    }

    #[must_use]
    pub fn output_example(mut self, example: impl Into<Value>) -> Self {
        self.contract = self.contract.output_example(example);
        self
    }

    /// Validate the definition and bind the handler.
    pub fn handler(self, handler: impl Handler + 'static) -> Result<Procedure, ConfigError> {
        let contract = self.contract.build()?;
        Ok(Procedure::new(
            Arc::new(contract),
            self.middlewares,
            Arc::new(handler),
        ))
    }
}
