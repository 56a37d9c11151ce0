use crate::backend::{self, Row};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::any;
use tracing::warn;

pub fn deserialize_optional<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value: Option<T> = Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Deserializes an optional value, treating a malformed value like an absent one.
pub fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!(error = %e, "ignoring malformed {}", any::type_name::<T>());
            Ok(None)
        }
    }
}

pub(crate) fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, backend::Error> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Builds a row from a JSON object literal.
pub(crate) fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
