//! Contour server runtime
//!
//! This layer turns contracts into something callable:
//! - `Middleware` / `Next`: interceptors composed into a `Chain` around a handler
//! - `Handler`: the body of a procedure, plain or serde-typed
//! - `Procedure` / `ProcedureBuilder`: a contract bound to middleware and a handler
//! - `Router` / `LazyRouter`: named procedure trees, with subtrees loaded on demand
//! - `Implementer`: contract-first binding of handlers to a `ContractRouter`
//! - `RouterLink`: an in-process `ClientLink` over a router
//!
//! # Example
//!
//! ```rust,ignore
//! use contour_server::{ProcedureBuilder, Router, RouterLink, typed_handler};
//!
//! let get_post = ProcedureBuilder::new()
//!     .middleware(auth)
//!     .input(SerdeSchema::<GetPost>::new())
//!     .error("POST_NOT_FOUND", ErrorSpec::new(404))
//!     .handler(typed_handler(|ctx, input: GetPost| async move { find_post(&ctx, input.id) }))?;
//!
//! let app = Router::new()
//!     .router("posts", Router::new().procedure("getPost", get_post)?)?
//!     .lazy("admin", loader_fn(|| async { Ok(admin::router().into()) }))?;
//!
//! let link = RouterLink::new(app);
//! ```

mod builder;
mod chain;
mod handler;
mod hooks;
mod implementer;
mod lazy;
mod link;
mod logging;
mod middleware;
mod procedure;
mod router;

pub use builder::ProcedureBuilder;
pub use chain::Chain;
pub use handler::{handler_fn, typed_handler, Handler, HandlerFn, HandlerRef, TypedHandler};
pub use hooks::{on_error, on_finish, on_start, on_success, OnError, OnFinish, OnStart, OnSuccess};
pub use implementer::Implementer;
pub use lazy::{loader_fn, LazyRouter, LoaderFn, RouterLoader, RouterModule};
pub use link::{RouterLink, RouterLinkConfig};
pub use logging::LoggingMiddleware;
pub use middleware::{middleware_fn, Invocation, Middleware, MiddlewareFn, MiddlewareRef, Next};
pub use procedure::Procedure;
pub use router::{Router, RouterNode};
