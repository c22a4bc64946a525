//! Procedure definitions: the contract half of a procedure.
//!
//! A [`ContractProcedure`] describes a callable unit (route metadata, input
//! and output contracts, declared errors) and has no behavior. It is
//! validated once when built and is immutable afterwards, so a single
//! definition is shared by every call through an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{AnySchema, ConfigError, Schema, SchemaRef, Value};

/// The structural tag stored under [`TYPE_KEY`].
pub const CONTRACT_PROCEDURE_TAG: &str = "ContractProcedure";
/// Key holding the structural tag in [`ContractProcedure::describe`].
pub const TYPE_KEY: &str = "~type";
/// Key holding the definition body in [`ContractProcedure::describe`].
pub const CONTRACT_KEY: &str = "~contract";

/// HTTP method for route metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    GET,
    #[default]
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => http::Method::GET,
            HttpMethod::POST => http::Method::POST,
            HttpMethod::PUT => http::Method::PUT,
            HttpMethod::DELETE => http::Method::DELETE,
            HttpMethod::PATCH => http::Method::PATCH,
            HttpMethod::HEAD => http::Method::HEAD,
            HttpMethod::OPTIONS => http::Method::OPTIONS,
        }
    }
}

impl TryFrom<http::Method> for HttpMethod {
    type Error = http::Method;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(HttpMethod::GET),
            http::Method::POST => Ok(HttpMethod::POST),
            http::Method::PUT => Ok(HttpMethod::PUT),
            http::Method::DELETE => Ok(HttpMethod::DELETE),
            http::Method::PATCH => Ok(HttpMethod::PATCH),
            http::Method::HEAD => Ok(HttpMethod::HEAD),
            http::Method::OPTIONS => Ok(HttpMethod::OPTIONS),
            other => Err(other),
        }
    }
}

/// Route metadata consumed by HTTP links and documentation generators.
///
/// Deserializable so route tables can live in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    /// Path template, e.g. `/posts/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Status reported on success. Must be a 2xx status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_status: Option<u16>,
}

impl RouteOptions {
    /// Check the invariants that cannot be expressed in the type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(status) = self.success_status {
            let is_success = http::StatusCode::from_u16(status)
                .map(|code| code.is_success())
                .unwrap_or(false);
            if !is_success {
                return Err(ConfigError::InvalidSuccessStatus(status));
            }
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut value = Value::map().with("deprecated", self.deprecated);
        if let Some(method) = self.method {
            value = value.with("method", method.as_str());
        }
        if let Some(path) = &self.path {
            value = value.with("path", path.as_str());
        }
        if let Some(summary) = &self.summary {
            value = value.with("summary", summary.as_str());
        }
        if let Some(description) = &self.description {
            value = value.with("description", description.as_str());
        }
        if !self.tags.is_empty() {
            value = value.with("tags", self.tags.clone());
        }
        if let Some(status) = self.success_status {
            value = value.with("successStatus", status);
        }
        value
    }
}

/// A declared error kind.
#[derive(Clone)]
pub struct ErrorSpec {
    pub status: u16,
    pub message: Option<String>,
    /// Contract for the error's `data`, if the kind carries any.
    pub data: Option<SchemaRef>,
}

impl ErrorSpec {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            data: None,
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn data(mut self, schema: impl Schema + 'static) -> Self {
        self.data = Some(Arc::new(schema));
        self
    }
}

impl fmt::Debug for ErrorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSpec")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

/// Error code to declared error kind.
pub type ErrorMap = BTreeMap<String, ErrorSpec>;

/// An immutable procedure definition.
#[derive(Clone)]
pub struct ContractProcedure {
    route: RouteOptions,
    input: SchemaRef,
    output: SchemaRef,
    errors: ErrorMap,
    input_example: Option<Value>,
    output_example: Option<Value>,
}

impl ContractProcedure {
    pub fn builder() -> ContractProcedureBuilder {
        ContractProcedureBuilder::default()
    }

    pub fn route(&self) -> &RouteOptions {
        &self.route
    }

    pub fn input(&self) -> &SchemaRef {
        &self.input
    }

    pub fn output(&self) -> &SchemaRef {
        &self.output
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, code: &str) -> Option<&ErrorSpec> {
        self.errors.get(code)
    }

    pub fn input_example(&self) -> Option<&Value> {
        self.input_example.as_ref()
    }

    pub fn output_example(&self) -> Option<&Value> {
        self.output_example.as_ref()
    }

    /// A plain structural record of this definition.
    ///
    /// The record can cross boundaries where type identity is lost (for
    /// instance a serialized contract) and still be recognised by
    /// [`is_contract_procedure`].
    pub fn describe(&self) -> Value {
        let errors = self
            .errors
            .iter()
            .map(|(code, spec)| {
                let mut entry = Value::map().with("status", spec.status);
                if let Some(message) = &spec.message {
                    entry = entry.with("message", message.as_str());
                }
                if let Some(data) = &spec.data {
                    entry = entry.with("data", data.describe());
                }
                (code.clone(), entry)
            })
            .collect::<BTreeMap<_, _>>();

        let mut body = Value::map()
            .with("input", self.input.describe())
            .with("output", self.output.describe())
            .with("route", self.route.to_value())
            .with("errors", Value::Map(errors));
        if let Some(example) = &self.input_example {
            body = body.with("inputExample", example.clone());
        }
        if let Some(example) = &self.output_example {
            body = body.with("outputExample", example.clone());
        }

        Value::map()
            .with(TYPE_KEY, CONTRACT_PROCEDURE_TAG)
            .with(CONTRACT_KEY, body)
    }
}

impl fmt::Debug for ContractProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractProcedure")
            .field("route", &self.route)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Recognise a procedure definition by shape rather than by type.
///
/// True when `value` is a map tagged `"~type": "ContractProcedure"` whose
/// `"~contract"` entry is a map holding both `input` and `output`.
pub fn is_contract_procedure(value: &Value) -> bool {
    let tagged = value.get(TYPE_KEY).and_then(Value::as_str) == Some(CONTRACT_PROCEDURE_TAG);
    let body = value.get(CONTRACT_KEY).and_then(Value::as_map);
    tagged && body.is_some_and(|body| body.contains_key("input") && body.contains_key("output"))
}

impl From<ContractProcedure> for ContractProcedureBuilder {
    fn from(contract: ContractProcedure) -> Self {
        Self {
            route: contract.route,
            input: Some(contract.input),
            output: Some(contract.output),
            errors: contract.errors,
            input_example: contract.input_example,
            output_example: contract.output_example,
        }
    }
}

/// Builder for [`ContractProcedure`].
///
/// Missing input/output contracts default to [`AnySchema`].
#[derive(Clone, Default)]
pub struct ContractProcedureBuilder {
    route: RouteOptions,
    input: Option<SchemaRef>,
    output: Option<SchemaRef>,
    errors: ErrorMap,
    input_example: Option<Value>,
    output_example: Option<Value>,
}

impl ContractProcedureBuilder {
    #[must_use]
    pub fn route(mut self, route: RouteOptions) -> Self {
        self.route = route;
        self
    }

    #[must_use]
    pub fn input(mut self, schema: impl Schema + 'static) -> Self {
        self.input = Some(Arc::new(schema));
        self
    }

    #[must_use]
    pub fn input_ref(mut self, schema: SchemaRef) -> Self {
        self.input = Some(schema);
        self
    }

    #[must_use]
    pub fn output(mut self, schema: impl Schema + 'static) -> Self {
        self.output = Some(Arc::new(schema));
        self
    }

    #[must_use]
    pub fn output_ref(mut self, schema: SchemaRef) -> Self {
        self.output = Some(schema);
        self
    }

    /// Declare an error kind. A later declaration of the same code wins.
    #[must_use]
    pub fn error(mut self, code: impl Into<String>, spec: ErrorSpec) -> Self {
        self.errors.insert(code.into(), spec);
        self
    }

    #[must_use]
    pub fn errors(mut self, errors: ErrorMap) -> Self {
        self.errors.extend(errors);
        self
    }

    #[must_use]
    pub fn input_example(mut self, example: impl Into<Value>) -> Self {
        self.input_example = Some(example.into());
        self
    }

    #[must_use]
    pub fn output_example(mut self, example: impl Into<Value>) -> Self {
        self.output_example = Some(example.into());
        self
    }

    /// Validate and freeze the definition.
    pub fn build(self) -> Result<ContractProcedure, ConfigError> {
        self.route.validate()?;
        for (code, spec) in &self.errors {
            if code.is_empty() {
                return Err(ConfigError::EmptyErrorCode);
            }
            if !(400..=599).contains(&spec.status) {
                return Err(ConfigError::InvalidErrorStatus {
                    code: code.clone(),
                    status: spec.status,
                });
            }
        }

        Ok(ContractProcedure {
            route: self.route,
            input: self.input.unwrap_or_else(|| Arc::new(AnySchema)),
            output: self.output.unwrap_or_else(|| Arc::new(AnySchema)),
            errors: self.errors,
            input_example: self.input_example,
            output_example: self.output_example,
        })
    }
}
