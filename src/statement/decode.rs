//! Cell decoding: wire fields to decoded values.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use tracing::warn;

use super::types::Value;
use crate::data_api::Field;

/// Decodes one wire cell. Never fails: unknown shapes decode to NULL.
pub fn decode_field(field: Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Boolean(b) => Value::Bool(b),
        Field::Long(v) => Value::Int(v),
        Field::Double(v) => Value::Float(v),
        Field::String(s) => Value::String(s),
        Field::Blob(encoded) => match BASE64_STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => Value::Bytes(bytes),
            Err(e) => {
                warn!("Undecodable blob value, treating as NULL: {}", e);
                Value::Null
            }
        },
        Field::Unknown => Value::Null,
    }
}

/// Decodes every cell of a wire row, preserving column order.
pub fn decode_row(row: Vec<Field>) -> Vec<Value> {
    row.into_iter().map(decode_field).collect()
}
