//! Contour: contract-first remote procedure calls.
//!
//! Procedures are declared once (route metadata, input and output contracts,
//! declared errors), bound to a handler, wrapped in ordered middleware,
//! composed into router trees, and called through a transport-agnostic
//! client. Each layer lives in its own crate and is re-exported here.

pub use contour_client as client;
pub use contour_contract as contract;
pub use contour_serde as serde;
pub use contour_server as server;

pub use contour_contract::path;

/// The names most applications need.
pub mod prelude {
    pub use contour_client::{Client, DynamicLink, LinkRegistry, SafeResult};
    pub use contour_contract::{
        codes, ClientLink, ClientOptions, Context, ContextExtension, ContractProcedure,
        ContractRouter, ErrorSpec, Path, RouteOptions, RpcError, Value,
    };
    pub use contour_serde::{SerdeSchema, TypedLink};
    pub use contour_server::{
        handler_fn, loader_fn, middleware_fn, typed_handler, Implementer, Middleware, Next,
        ProcedureBuilder, Router, RouterLink,
    };
}
