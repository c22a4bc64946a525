//! Typed calls over any link.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use contour_contract::{ClientLink, ClientOptions, Path, RpcError};

use crate::convert::{from_value, to_value};

/// Extension trait for typed calls.
///
/// Automatically implemented for every [`ClientLink`]. The input is
/// serialized into a `Value` before the call and the output deserialized
/// after it.
///
/// # Example
///
/// ```rust,ignore
/// use contour_serde::TypedLink;
///
/// let post: Post = link
///     .call_as(&path!("posts/getPost"), &GetPost { id: 1 }, ClientOptions::new())
///     .await?;
/// ```
#[async_trait]
pub trait TypedLink: ClientLink {
    async fn call_as<I, O>(
        &self,
        path: &Path,
        input: &I,
        options: ClientOptions,
    ) -> Result<O, RpcError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned + Send,
    {
        let input = to_value(input)
            .map_err(|e| RpcError::bad_request(format!("cannot encode input: {}", e)))?;
        let output = self.call(path, input, options).await?;
        from_value(output).map_err(|e| RpcError::internal(format!("cannot decode output: {}", e)))
    }
}

// Blanket implementation for all links
impl<L: ClientLink + ?Sized> TypedLink for L {}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_contract::{codes, path, Value};
    use serde::Deserialize;

    /// Doubles the `n` field of its input.
    struct Doubler;

    #[async_trait]
    impl ClientLink for Doubler {
        async fn call(
            &self,
            _path: &Path,
            input: Value,
            _options: ClientOptions,
        ) -> Result<Value, RpcError> {
            let n = input.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::map().with("n", n * 2))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Number {
        n: i64,
    }

    #[tokio::test]
    async fn typed_roundtrip() {
        let out: Number = Doubler
            .call_as(&path!("double"), &Number { n: 21 }, ClientOptions::new())
            .await
            .unwrap();
        assert_eq!(out, Number { n: 42 });
    }

    #[tokio::test]
    async fn undecodable_output_is_internal() {
        #[derive(Debug, Deserialize)]
        struct Wrong {
            #[allow(dead_code)]
            missing: String,
        }

        let result: Result<Wrong, RpcError> = Doubler
            .call_as(&path!("double"), &Number { n: 1 }, ClientOptions::new())
            .await;
        assert_eq!(result.unwrap_err().code(), codes::INTERNAL_SERVER_ERROR);
    }
}
