//! Bound procedures: a contract plus middleware plus a handler.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use contour_contract::{default_message, default_status, ContractProcedure, RpcError, Value};

use crate::{Chain, Handler, Invocation, MiddlewareRef};

/// Validates input right before the handler runs and output right after.
///
/// Validation sits inside the middleware chain so that middlewares see the
/// raw input and the validated output.
struct ValidatedHandler {
    contract: Arc<ContractProcedure>,
    handler: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ValidatedHandler {
    async fn handle(&self, mut invocation: Invocation) -> Result<Value, RpcError> {
        invocation.input = self
            .contract
            .input()
            .parse(invocation.input)
            .map_err(|e| RpcError::input_validation(&e))?;

        let path = invocation.path.clone();
        let output = self.handler.handle(invocation).await?;

        self.contract.output().parse(output).map_err(|e| {
            warn!("Output of '{}' failed validation: {}", path, e);
            RpcError::output_validation()
        })
    }
}

/// A procedure ready to be called.
///
/// Immutable once built; cloning shares the composed chain.
#[derive(Clone)]
pub struct Procedure {
    contract: Arc<ContractProcedure>,
    middlewares: Vec<MiddlewareRef>,
    chain: Chain,
}

impl Procedure {
    pub fn new(
        contract: Arc<ContractProcedure>,
        middlewares: Vec<MiddlewareRef>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        let validated: Arc<dyn Handler> = Arc::new(ValidatedHandler {
            contract: contract.clone(),
            handler,
        });
        let chain = Chain::new(&middlewares, validated);
        Self {
            contract,
            middlewares,
            chain,
        }
    }

    pub fn contract(&self) -> &ContractProcedure {
        &self.contract
    }

    pub fn contract_ref(&self) -> &Arc<ContractProcedure> {
        &self.contract
    }

    pub fn middlewares(&self) -> &[MiddlewareRef] {
        &self.middlewares
    }

    /// Run the procedure.
    ///
    /// Errors whose code appears in the contract's error map are completed
    /// from the declaration and marked defined, as long as their status and
    /// data agree with it. All others pass through untouched.
    pub async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        debug!("Invoking procedure at '{}'", invocation.path);
        self.chain
            .invoke(invocation)
            .await
            .map_err(|error| self.classify(error))
    }

    fn classify(&self, error: RpcError) -> RpcError {
        let Some(spec) = self.contract.error(error.code()) else {
            return error;
        };

        let status = error.status();
        if status != spec.status && status != default_status(error.code()) {
            warn!(
                "Declared error '{}' carries status {}, expected {}",
                error.code(),
                status,
                spec.status
            );
            return error;
        }

        if let Some(schema) = &spec.data {
            let data = error.data().cloned().unwrap_or_default();
            match schema.parse(data) {
                Ok(data) => return self.complete(error.with_data(data), spec.status),
                Err(e) => {
                    warn!("Data of declared error '{}' failed validation: {}", error.code(), e);
                    return error;
                }
            }
        }
        self.complete(error, spec.status)
    }

    fn complete(&self, mut error: RpcError, status: u16) -> RpcError {
        let code = error.code().to_string();
        error = error.with_status(status).with_defined(true);
        if error.message() == default_message(&code) {
            if let Some(message) = self.contract.error(&code).and_then(|s| s.message.clone()) {
                error = error.with_message(message);
            }
        }
        error
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("contract", &self.contract)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}
