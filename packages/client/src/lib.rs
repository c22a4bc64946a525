//! Contour client
//!
//! The caller's side of a call:
//! - `Client` / `ProcedureClient`: call by path, plain or as a `SafeResult`
//! - `DynamicLink`: a link that picks its delegate per call
//! - `LinkResolver`: the selection strategy, built with `resolve_with`,
//!   `resolve_with_async` or a `LinkRegistry`
//!
//! # Example
//!
//! ```rust,ignore
//! use contour_client::{Client, DynamicLink, LinkRegistry};
//!
//! let client = Client::new(DynamicLink::new(
//!     LinkRegistry::new()
//!         .register("billing", billing_link)
//!         .fallback(RouterLink::new(app)),
//! ));
//!
//! let post = client
//!     .call(&path!("posts/getPost"), Value::map().with("id", 1i64), ClientOptions::new())
//!     .await?;
//! ```

mod client;
mod dynamic_link;

pub use client::{Client, ProcedureClient, SafeResult};
pub use dynamic_link::{
    resolve_with, resolve_with_async, AsyncResolver, DynamicLink, LinkRegistry, LinkResolver,
    SyncResolver,
};
