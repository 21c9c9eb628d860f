use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::schema::Schema;
use crate::Result;

/// A typed payload that knows its own wire schema.
///
/// Implementors are only ever built from JSON that already passed
/// [`Payload::schema`], so handler code never sees a wrongly shaped value.
pub trait Payload: DeserializeOwned + 'static {
    fn schema() -> Schema;
}

/// Validates `value` against `T::schema()` and converts it into `T`.
pub fn narrow<T: Payload>(value: Value) -> Result<T> {
    T::schema().validate(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// An "undefined" payload.
impl Payload for () {
    fn schema() -> Schema {
        Schema::null()
    }
}

impl Payload for String {
    fn schema() -> Schema {
        Schema::string()
    }
}

impl Payload for bool {
    fn schema() -> Schema {
        Schema::boolean()
    }
}

impl Payload for f64 {
    fn schema() -> Schema {
        Schema::number()
    }
}

impl Payload for Value {
    fn schema() -> Schema {
        Schema::any()
    }
}

impl<T: Payload> Payload for Option<T> {
    fn schema() -> Schema {
        T::schema().optional()
    }
}

impl<T: Payload> Payload for Vec<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}
