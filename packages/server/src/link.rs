//! In-process transport: a [`ClientLink`] that serves calls from a router.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use log::warn;
use serde::{Deserialize, Serialize};

use contour_contract::{codes, default_message, ClientLink, ClientOptions, Path, RpcError, Value};

use crate::{Invocation, Router};

/// Configuration for a [`RouterLink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterLinkConfig {
    /// Convert handler and middleware panics into `INTERNAL_SERVER_ERROR`.
    pub catch_panics: bool,

    /// Let undeclared internal errors cross the link with their message
    /// and data intact.
    pub expose_internal_errors: bool,
}

impl Default for RouterLinkConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            expose_internal_errors: false,
        }
    }
}

/// Serves calls from a [`Router`] in the same process.
///
/// The call path is the override from the call options if one is set.
/// The procedure runs with the caller's context and cancellation signal.
#[derive(Clone, Debug)]
pub struct RouterLink {
    router: Router,
    config: RouterLinkConfig,
}

impl RouterLink {
    pub fn new(router: Router) -> Self {
        Self::with_config(router, RouterLinkConfig::default())
    }

    pub fn with_config(router: Router, config: RouterLinkConfig) -> Self {
        Self { router, config }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &RouterLinkConfig {
        &self.config
    }

    async fn dispatch(
        &self,
        path: Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        options.check_cancelled()?;
        let procedure = self.router.resolve(&path).await?;

        let mut invocation = Invocation::new(path, input).with_context(options.context);
        invocation.signal = options.signal;

        procedure.invoke(invocation).await
    }

    fn sanitize(&self, error: RpcError) -> RpcError {
        if self.config.expose_internal_errors
            || error.is_defined()
            || error.code() != codes::INTERNAL_SERVER_ERROR
        {
            return error;
        }
        error
            .with_message(default_message(codes::INTERNAL_SERVER_ERROR))
            .without_data()
    }
}

#[async_trait]
impl ClientLink for RouterLink {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        let target = options.target(path).clone();
        let call = self.dispatch(target.clone(), input, options);

        let result = if self.config.catch_panics {
            match AssertUnwindSafe(call).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let error = RpcError::from_panic(payload.as_ref());
                    warn!("Procedure at '{}' panicked: {}", target, error.message());
                    Err(error)
                }
            }
        } else {
            call.await
        };

        result.map_err(|error| self.sanitize(error))
    }
}
