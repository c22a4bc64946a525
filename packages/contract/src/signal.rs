//! Cooperative cancellation.

use tokio_util::sync::CancellationToken;

use crate::RpcError;

/// A cancellation signal shared between a caller and the steps of a call.
///
/// Clones observe the same signal. Nothing is aborted forcibly: steps that
/// do interruptible work check [`CancellationSignal::check`] or race
/// [`CancellationSignal::cancelled`] against their own futures.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the signal cancelled and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Fail with a `CANCELLED` error if the signal has fired.
    pub fn check(&self) -> Result<(), RpcError> {
        if self.is_cancelled() {
            Err(RpcError::cancelled())
        } else {
            Ok(())
        }
    }
}

impl From<CancellationToken> for CancellationSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
