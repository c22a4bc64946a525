//! The caller-facing call abstraction.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use log::warn;

use contour_contract::{ClientLink, ClientOptions, LinkRef, Path, RpcError, Value};

/// Calls procedures by path through a [`ClientLink`].
///
/// The client performs no validation and no transport of its own: every
/// call is handed to the link and its outcome returned unchanged. A link
/// that panics fails the call with `INTERNAL_SERVER_ERROR`. Cloning shares
/// the link.
///
/// `Client` is itself a link, so typed calls (`contour_serde::TypedLink`)
/// work on it directly.
#[derive(Clone)]
pub struct Client {
    link: LinkRef,
}

impl Client {
    pub fn new(link: impl ClientLink + 'static) -> Self {
        Self {
            link: Arc::new(link),
        }
    }

    pub fn from_ref(link: LinkRef) -> Self {
        Self { link }
    }

    pub fn link(&self) -> &LinkRef {
        &self.link
    }

    /// Call the procedure at `path`.
    pub async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        let call = self.link.call(path, input, options);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let error = RpcError::from_panic(payload.as_ref());
                warn!("Link panicked while calling '{}': {}", path, error.message());
                Err(error)
            }
        }
    }

    /// Call the procedure at `path`, folding the outcome into a [`SafeResult`].
    pub async fn safe(&self, path: &Path, input: Value, options: ClientOptions) -> SafeResult {
        SafeResult::from(self.call(path, input, options).await)
    }

    /// A handle bound to one procedure path.
    pub fn procedure(&self, path: Path) -> ProcedureClient {
        ProcedureClient {
            client: self.clone(),
            path,
        }
    }
}

#[async_trait]
impl ClientLink for Client {
    async fn call(
        &self,
        path: &Path,
        input: Value,
        options: ClientOptions,
    ) -> Result<Value, RpcError> {
        Client::call(self, path, input, options).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

/// A client bound to a single procedure path.
#[derive(Clone, Debug)]
pub struct ProcedureClient {
    client: Client,
    path: Path,
}

impl ProcedureClient {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn call(&self, input: Value, options: ClientOptions) -> Result<Value, RpcError> {
        self.client.call(&self.path, input, options).await
    }

    pub async fn safe(&self, input: Value, options: ClientOptions) -> SafeResult {
        self.client.safe(&self.path, input, options).await
    }
}

/// The outcome of a call as plain data rather than a `Result`.
///
/// Exactly one of `error` and `data` is set. `is_defined` is true when the
/// error was declared by the procedure's contract.
#[derive(Clone, Debug, PartialEq)]
pub struct SafeResult {
    pub error: Option<RpcError>,
    pub data: Option<Value>,
    pub is_defined: bool,
}

impl SafeResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data.unwrap_or_default()),
        }
    }
}

impl From<Result<Value, RpcError>> for SafeResult {
    fn from(result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(data) => SafeResult {
                error: None,
                data: Some(data),
                is_defined: false,
            },
            Err(error) => SafeResult {
                is_defined: error.is_defined(),
                error: Some(error),
                data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_contract::{codes, path, Context};

    use crate::{resolve_with, DynamicLink};

    /// Succeeds on `ok`, fails with a defined error on `defined`, and an
    /// undefined one everywhere else.
    struct Scripted;

    #[async_trait]
    impl ClientLink for Scripted {
        async fn call(
            &self,
            path: &Path,
            input: Value,
            _options: ClientOptions,
        ) -> Result<Value, RpcError> {
            match path.to_string().as_str() {
                "ok" => Ok(input),
                "defined" => Err(RpcError::new("OUT_OF_STOCK")
                    .with_status(409)
                    .with_defined(true)),
                "panic" => panic!("link bug"),
                _ => Err(RpcError::not_found(path)),
            }
        }
    }

    #[tokio::test]
    async fn call_returns_link_outcome_verbatim() {
        let client = Client::new(Scripted);
        let out = client
            .call(&path!("ok"), Value::from(3i64), ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Value::Integer(3));

        let err = client
            .call(&path!("nope"), Value::Null, ClientOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::not_found(&path!("nope")));
    }

    #[tokio::test]
    async fn safe_results_split_error_and_data() {
        let client = Client::new(Scripted);

        let ok = client
            .safe(&path!("ok"), Value::from("x"), ClientOptions::new())
            .await;
        assert!(ok.is_ok());
        assert_eq!(ok.data, Some(Value::from("x")));
        assert!(!ok.is_defined);

        let defined = client
            .safe(&path!("defined"), Value::Null, ClientOptions::new())
            .await;
        assert!(defined.is_err());
        assert!(defined.is_defined);
        assert!(defined.data.is_none());

        let undefined = client
            .procedure(path!("missing"))
            .safe(Value::Null, ClientOptions::new())
            .await;
        assert!(!undefined.is_defined);
        assert_eq!(
            undefined.into_result().unwrap_err().code(),
            codes::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn link_panics_become_internal_errors() {
        let client = Client::new(Scripted);
        let err = client
            .call(&path!("panic"), Value::Null, ClientOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "link bug");
        assert!(!err.is_defined());
    }

    #[tokio::test]
    async fn resolver_panics_do_not_cross_the_client() {
        let client = Client::new(DynamicLink::new(resolve_with(
            |_: &Path, _: &Value, _: &Context| -> Result<LinkRef, RpcError> {
                panic!("resolver bug")
            },
        )));

        let outcome = tokio::spawn(async move {
            client
                .safe(&path!("posts/get"), Value::Null, ClientOptions::new())
                .await
        })
        .await;
        let safe = outcome.unwrap();
        assert!(!safe.is_defined);
        assert_eq!(safe.error.unwrap().code(), codes::INTERNAL_SERVER_ERROR);
    }
}
