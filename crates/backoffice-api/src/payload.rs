//! Draft text to write payload encoding
//!
//! Drafts keep raw user input for every field. Numeric input is only
//! interpreted here, at submit time, and nothing is rejected: text that does
//! not parse is sent as-is so the store's own column constraints decide.

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::record::{Editable, FieldKind};

/// Column values of a record write. Never carries `id`.
pub type Payload = serde_json::Map<String, JsonValue>;

/// Store column holding the uploaded asset reference
pub const IMAGE_REF_COLUMN: &str = "img_url";

/// Build the write payload for a draft of `T`.
///
/// Fields missing from `fields` fall back to their field default. An empty
/// image reference is written as `null`.
pub fn encode_draft<T: Editable>(
    fields: &BTreeMap<String, String>,
    image_ref: Option<&str>,
) -> Payload {
    let mut payload = Payload::new();

    for spec in T::fields() {
        let raw = fields
            .get(spec.name)
            .map(String::as_str)
            .unwrap_or(spec.default);
        payload.insert(spec.name.to_string(), encode_field(spec.kind, raw));
    }

    let image = match image_ref {
        Some(url) if !url.is_empty() => JsonValue::String(url.to_string()),
        _ => JsonValue::Null,
    };
    payload.insert(IMAGE_REF_COLUMN.to_string(), image);

    payload
}

fn encode_field(kind: FieldKind, raw: &str) -> JsonValue {
    match kind {
        FieldKind::Text | FieldKind::Choice(_) => JsonValue::String(raw.to_string()),
        FieldKind::Decimal => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                JsonValue::Null
            } else if let Ok(d) = Decimal::from_str(trimmed) {
                JsonValue::String(d.normalize().to_string())
            } else {
                JsonValue::String(raw.to_string())
            }
        }
        FieldKind::Integer => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                JsonValue::Null
            } else if let Ok(i) = trimmed.parse::<i64>() {
                JsonValue::from(i)
            } else {
                JsonValue::String(raw.to_string())
            }
        }
    }
}
