//! Serde integration for Contour
//!
//! This layer gives the dynamically-typed core a typed surface:
//! - `to_value` / `from_value`: Value <-> serde conversions
//! - `SerdeSchema<T>`: a schema that accepts what `T` deserializes from
//! - `TypedLink`: typed calls over any `ClientLink`
//!
//! # Example
//!
//! ```rust,ignore
//! use contour_serde::{SerdeSchema, TypedLink};
//!
//! let contract = ContractProcedure::builder()
//!     .input(SerdeSchema::<GetPost>::new())
//!     .output(SerdeSchema::<Post>::new())
//!     .build()?;
//!
//! let post: Post = link.call_as(&path!("posts/getPost"), &GetPost { id: 1 }, options).await?;
//! ```

mod convert;
mod schema;
mod typed;

pub use convert::{from_value, json_to_value, to_value, value_to_json, ConvertError};
pub use schema::SerdeSchema;
pub use typed::TypedLink;
