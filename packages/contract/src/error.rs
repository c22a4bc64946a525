//! Error types shared by every layer.
//!
//! [`RpcError`] is the only failure that crosses the client boundary: it
//! carries a stable `code` callers match on, an HTTP-flavoured `status`, a
//! human message and optional structured `data`. [`ConfigError`] is raised
//! while definitions are being built and never at call time.

use std::any::Any;
use std::fmt;

use crate::{Path, ValidationError, Value};

/// Well-known error codes.
pub mod codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const METHOD_NOT_SUPPORTED: &str = "METHOD_NOT_SUPPORTED";
    pub const NOT_ACCEPTABLE: &str = "NOT_ACCEPTABLE";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const CONFLICT: &str = "CONFLICT";
    pub const PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "UNSUPPORTED_MEDIA_TYPE";
    pub const UNPROCESSABLE_CONTENT: &str = "UNPROCESSABLE_CONTENT";
    pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
    pub const CLIENT_CLOSED_REQUEST: &str = "CLIENT_CLOSED_REQUEST";
    pub const CANCELLED: &str = "CANCELLED";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
    pub const BAD_GATEWAY: &str = "BAD_GATEWAY";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const GATEWAY_TIMEOUT: &str = "GATEWAY_TIMEOUT";
}

/// Default status for a well-known code; 500 for anything else.
pub fn default_status(code: &str) -> u16 {
    match code {
        codes::BAD_REQUEST => 400,
        codes::UNAUTHORIZED => 401,
        codes::FORBIDDEN => 403,
        codes::NOT_FOUND => 404,
        codes::METHOD_NOT_SUPPORTED => 405,
        codes::NOT_ACCEPTABLE => 406,
        codes::TIMEOUT => 408,
        codes::CONFLICT => 409,
        codes::PRECONDITION_FAILED => 412,
        codes::PAYLOAD_TOO_LARGE => 413,
        codes::UNSUPPORTED_MEDIA_TYPE => 415,
        codes::UNPROCESSABLE_CONTENT => 422,
        codes::TOO_MANY_REQUESTS => 429,
        codes::CLIENT_CLOSED_REQUEST | codes::CANCELLED => 499,
        codes::NOT_IMPLEMENTED => 501,
        codes::BAD_GATEWAY => 502,
        codes::SERVICE_UNAVAILABLE => 503,
        codes::GATEWAY_TIMEOUT => 504,
        _ => 500,
    }
}

/// Title-cased words of a code: `NOT_FOUND` becomes `Not Found`.
pub fn default_message(code: &str) -> String {
    code.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A typed call failure.
///
/// `defined` is set by the runtime when the error matches an entry in the
/// failing procedure's declared error map; callers use it to tell
/// contract errors apart from incidental ones.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    code: String,
    status: u16,
    message: String,
    data: Option<Value>,
    defined: bool,
}

impl RpcError {
    /// An error with the default status and message for `code`.
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            status: default_status(&code),
            message: default_message(&code),
            code,
            data: None,
            defined: false,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }

    /// Set whether this error matches a declared error of the procedure.
    #[must_use]
    pub fn with_defined(mut self, defined: bool) -> Self {
        self.defined = defined;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == codes::CANCELLED
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(codes::BAD_REQUEST).with_message(message)
    }

    pub fn not_found(path: &Path) -> Self {
        Self::new(codes::NOT_FOUND).with_message(format!("no procedure at '{}'", path))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_SERVER_ERROR).with_message(message)
    }

    /// An `INTERNAL_SERVER_ERROR` carrying the message of a caught panic.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::internal(message)
    }

    pub fn cancelled() -> Self {
        Self::new(codes::CANCELLED).with_message("call was cancelled")
    }

    /// Input did not satisfy the procedure's input contract.
    pub fn input_validation(error: &ValidationError) -> Self {
        Self::new(codes::BAD_REQUEST)
            .with_message("Input validation failed")
            .with_data(Value::map().with("issues", error.issues_value()))
    }

    /// Output did not satisfy the procedure's output contract.
    ///
    /// The issues are a server-side defect and are not attached.
    pub fn output_validation() -> Self {
        Self::new(codes::INTERNAL_SERVER_ERROR).with_message("Output validation failed")
    }

    /// A structural record of this error, for links that encode errors.
    pub fn to_value(&self) -> Value {
        let mut value = Value::map()
            .with("code", self.code.as_str())
            .with("status", self.status)
            .with("message", self.message.as_str())
            .with("defined", self.defined);
        if let Some(data) = &self.data {
            value = value.with("data", data.clone());
        }
        value
    }

    /// Rebuild an error from [`RpcError::to_value`] output.
    ///
    /// Returns `None` when the value does not carry at least a string `code`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let code = value.get("code")?.as_str()?;
        let mut error = RpcError::new(code);
        if let Some(status) = value.get("status").and_then(Value::as_i64) {
            error.status = u16::try_from(status).ok()?;
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            error.message = message.to_string();
        }
        error.data = value.get("data").cloned();
        error.defined = value
            .get("defined")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Some(error)
    }
}

/// Invalid static definitions, reported when they are built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("success status must be between 200 and 299, got {0}")]
    InvalidSuccessStatus(u16),

    #[error("error '{code}' must declare a status between 400 and 599, got {status}")]
    InvalidErrorStatus { code: String, status: u16 },

    #[error("error codes must not be empty")]
    EmptyErrorCode,

    #[error("duplicate router entry '{0}'")]
    DuplicateEntry(String),

    #[error("procedures without a handler: {}", join_paths(.0))]
    Unimplemented(Vec<Path>),

    #[error("no contract procedure at '{0}'")]
    UnknownProcedure(Path),

    #[error(transparent)]
    Path(#[from] crate::PathError),
}

fn join_paths(paths: &[Path]) -> impl fmt::Display + '_ {
    struct Joined<'a>(&'a [Path]);

    impl fmt::Display for Joined<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (i, path) in self.0.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", path)?;
            }
            Ok(())
        }
    }

    Joined(paths)
}
