//! The schema capability consumed by procedure definitions.
//!
//! The core does not ship a schema engine. Anything that can turn a raw
//! [`Value`] into a validated one (or explain why not) is a [`Schema`].

use std::fmt;
use std::sync::Arc;

use crate::{Path, Value};

/// One reason a value failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Location of the offending value inside the validated value.
    pub path: Path,
    pub message: String,
}

/// A value did not satisfy its contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed{}", join_issues(.issues))]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    /// A single issue at the root of the value.
    pub fn new(message: impl Into<String>) -> Self {
        Self::at(Path::root(), message)
    }

    /// A single issue at `path`.
    pub fn at(path: Path, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path,
                message: message.into(),
            }],
        }
    }

    pub fn from_issues(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn push(&mut self, path: Path, message: impl Into<String>) {
        self.issues.push(Issue {
            path,
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// The issues as `[{ "path": [...], "message": "..." }]`.
    pub fn issues_value(&self) -> Value {
        Value::Array(
            self.issues
                .iter()
                .map(|issue| {
                    Value::map()
                        .with("path", Value::from(issue.path.segments.clone()))
                        .with("message", issue.message.as_str())
                })
                .collect(),
        )
    }
}

fn join_issues(issues: &[Issue]) -> impl fmt::Display + '_ {
    struct Joined<'a>(&'a [Issue]);

    impl fmt::Display for Joined<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for issue in self.0 {
                if issue.path.is_empty() {
                    write!(f, "; {}", issue.message)?;
                } else {
                    write!(f, "; {}: {}", issue.path, issue.message)?;
                }
            }
            Ok(())
        }
    }

    Joined(issues)
}

/// Validates (and may transform) values crossing a procedure boundary.
pub trait Schema: Send + Sync {
    /// Accept `value`, returning the validated value, or reject it.
    fn parse(&self, value: Value) -> Result<Value, ValidationError>;

    /// A description of the accepted shape for documentation generators.
    fn describe(&self) -> Value {
        Value::Null
    }
}

/// A shared schema handle.
pub type SchemaRef = Arc<dyn Schema>;

impl<S: Schema + ?Sized> Schema for Arc<S> {
    fn parse(&self, value: Value) -> Result<Value, ValidationError> {
        self.as_ref().parse(value)
    }

    fn describe(&self) -> Value {
        self.as_ref().describe()
    }
}

impl<S: Schema + ?Sized> Schema for Box<S> {
    fn parse(&self, value: Value) -> Result<Value, ValidationError> {
        self.as_ref().parse(value)
    }

    fn describe(&self) -> Value {
        self.as_ref().describe()
    }
}

/// Accepts every value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySchema;

impl Schema for AnySchema {
    fn parse(&self, value: Value) -> Result<Value, ValidationError> {
        Ok(value)
    }

    fn describe(&self) -> Value {
        Value::map().with("type", "any")
    }
}

/// A schema backed by a closure.
pub struct FnSchema<F> {
    parse: F,
    description: Value,
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn parse(&self, value: Value) -> Result<Value, ValidationError> {
        (self.parse)(value)
    }

    fn describe(&self) -> Value {
        self.description.clone()
    }
}

/// Build a schema from a validation closure and a description.
pub fn schema_fn<F>(description: impl Into<Value>, parse: F) -> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync,
{
    FnSchema {
        parse,
        description: description.into(),
    }
}
