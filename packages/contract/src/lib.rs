//! Contour contracts: the vocabulary shared by servers, clients and links.
//!
//! This layer defines what a call looks like without doing any dispatch:
//! - `Path`: the address of a procedure, an ordered list of segments
//! - `Value`: the dynamically-typed payload of inputs, outputs and errors
//! - `Context` / `ContextExtension`: per-call, layered key-value state
//! - `ContractProcedure`: an immutable procedure definition
//! - `RpcError` / `ConfigError` / `ValidationError`: the error taxonomy
//! - `ClientLink` / `ClientOptions`: the transport contract
//!
//! # Example
//!
//! ```rust
//! use contour_contract::{ContractProcedure, RouteOptions, HttpMethod, ErrorSpec};
//!
//! let get_post = ContractProcedure::builder()
//!     .route(RouteOptions {
//!         method: Some(HttpMethod::GET),
//!         path: Some("/posts/{id}".into()),
//!         ..Default::default()
//!     })
//!     .error("POST_NOT_FOUND", ErrorSpec::new(404))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(get_post.route().method, Some(HttpMethod::GET));
//! ```

mod context;
mod contract_router;
mod error;
mod link;
mod path;
mod procedure;
mod schema;
mod signal;
mod value;

pub use context::{Context, ContextExtension};
pub use contract_router::{ContractNode, ContractRouter};
pub use error::{codes, default_message, default_status, ConfigError, RpcError};
pub use link::{ClientLink, ClientOptions, LinkRef};
pub use path::{Path, PathError};
pub use procedure::{
    is_contract_procedure, ContractProcedure, ContractProcedureBuilder, ErrorMap, ErrorSpec,
    HttpMethod, RouteOptions, CONTRACT_KEY, CONTRACT_PROCEDURE_TAG, TYPE_KEY,
};
pub use schema::{schema_fn, AnySchema, FnSchema, Issue, Schema, SchemaRef, ValidationError};
pub use signal::CancellationSignal;
pub use value::Value;
