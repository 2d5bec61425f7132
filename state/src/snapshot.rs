//! Snapshot encoding
//!
//! A snapshot is the aggregate serialized as UTF-8 JSON: a top-level object
//! for object aggregates, a top-level array for list aggregates. Unknown
//! keys are ignored when decoding; missing keys take the aggregate's
//! field defaults.

use hirebase_core::{HirebaseError, HirebaseResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialize an aggregate to snapshot text
pub fn encode<A: Serialize>(value: &A) -> HirebaseResult<String> {
    serde_json::to_string(value).map_err(|e| HirebaseError::Serialization(e.to_string()))
}

/// Parse snapshot text back into an aggregate
pub fn decode<A: DeserializeOwned>(text: &str) -> HirebaseResult<A> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| HirebaseError::Deserialization(e.to_string()))?;
    
    if !(value.is_object() || value.is_array()) {
        return Err(HirebaseError::Deserialization(format!(
            "expected a JSON object or array, found {}",
            kind_of(&value)
        )));
    }
    
    serde_json::from_value(value).map_err(|e| HirebaseError::Deserialization(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
