//! Call logging through the `log` facade.

use std::time::Instant;

use async_trait::async_trait;
use log::{debug, Level};

use contour_contract::{RpcError, Value};

use crate::{Middleware, Next};

/// Logs the entry and exit of every call through the `log` facade.
///
/// Successful calls and defined errors are logged at `debug`; undefined
/// errors at `warn`.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    target: Option<String>,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log under `target` instead of this module's path.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(module_path!())
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, next: Next) -> Result<Value, RpcError> {
        let path = next.path().clone();
        let target = self.target();
        debug!(target: target, "-> {}", path);

        let started = Instant::now();
        let result = next.proceed().await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => debug!(target: target, "<- {} ok in {:?}", path, elapsed),
            Err(error) => {
                let level = if error.is_defined() {
                    Level::Debug
                } else {
                    Level::Warn
                };
                log::log!(
                    target: target,
                    level,
                    "<- {} failed with {} in {:?}",
                    path,
                    error.code(),
                    elapsed
                );
            }
        }
        result
    }
}
