//! Schemas backed by Rust types.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use contour_contract::{Schema, ValidationError, Value};

use crate::convert::{from_value, to_value};

/// A [`Schema`] that accepts exactly the values `T` deserializes from.
///
/// Parsing decodes into `T` and encodes back, so serde defaults and
/// renames are applied to the validated value.
///
/// ```rust
/// use contour_contract::{Schema, Value};
/// use contour_serde::SerdeSchema;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct GetPost { id: u32 }
///
/// let schema = SerdeSchema::<GetPost>::new();
/// assert!(schema.parse(Value::map().with("id", 1i64)).is_ok());
/// assert!(schema.parse(Value::from("1")).is_err());
/// ```
pub struct SerdeSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerdeSchema<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for SerdeSchema<T>
where
    T: Serialize + DeserializeOwned,
{
    fn parse(&self, value: Value) -> Result<Value, ValidationError> {
        let typed: T = from_value(value).map_err(|e| ValidationError::new(e.to_string()))?;
        to_value(&typed).map_err(|e| ValidationError::new(e.to_string()))
    }

    fn describe(&self) -> Value {
        Value::map()
            .with("type", "serde")
            .with("rust", std::any::type_name::<T>())
    }
}
