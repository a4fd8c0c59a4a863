//! Write-payload validation and normalization.
//!
//! Every failure is collected before the payload is rejected; callers get
//! either a normalized field list or the full error list, never a single
//! fail-fast message.

use crate::catalog::{self, FieldType, PAYLOAD_FIELDS};
use crate::clause::BindValue;
use serde_json::Value;

/// A coerced payload value. Blank text normalizes to an explicit null.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null(FieldType),
    Text(String),
    Int(i64),
    Num(f64),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    pub fn bind(&self) -> BindValue {
        match self {
            Self::Text(value) => BindValue::Text(value.clone()),
            Self::Int(value) => BindValue::Int(*value),
            Self::Num(value) => BindValue::Float(*value),
            Self::Null(FieldType::Text) => BindValue::NullText,
            Self::Null(FieldType::Int) => BindValue::NullInt,
            Self::Null(FieldType::Num) => BindValue::NullFloat,
        }
    }

    /// Placeholder cast keeping driver parameter types independent of the
    /// target column type.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Text(_) | Self::Null(FieldType::Text) => "?::text",
            Self::Int(_) | Self::Null(FieldType::Int) => "?::int8",
            Self::Num(_) | Self::Null(FieldType::Num) => "?::float8",
        }
    }
}

/// Normalized payload: whitelist fields that were present, in whitelist
/// order.
pub type NormalizedPayload = Vec<(&'static str, FieldValue)>;

pub type ValidationResult = std::result::Result<NormalizedPayload, Vec<String>>;

/// Validates a decoded request body against the writable-field whitelist.
/// Unknown fields, per-field coercion failures and missing required fields
/// are all reported together.
pub fn validate(payload: &Value, required: &[&str]) -> ValidationResult {
    let Some(fields) = payload.as_object() else {
        return Err(vec!["Invalid JSON payload.".to_string()]);
    };

    let mut errors = Vec::new();

    let mut unknown: Vec<&str> = fields
        .keys()
        .filter(|key| catalog::payload_field(key).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        errors.push(format!("Unknown fields: {}.", unknown.join(", ")));
    }

    let mut normalized = Vec::new();
    for (key, field_type) in PAYLOAD_FIELDS {
        let Some(value) = fields.get(*key) else {
            continue;
        };
        match coerce(key, *field_type, value) {
            Ok(coerced) => normalized.push((*key, coerced)),
            Err(error) => errors.push(error),
        }
    }

    for field in required {
        let present = normalized
            .iter()
            .any(|(key, value)| key == field && !value.is_null());
        if !present {
            errors.push(format!("{field} is required."));
        }
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

fn coerce(key: &str, field_type: FieldType, value: &Value) -> Result<FieldValue, String> {
    if value.is_null() || matches!(value, Value::String(s) if s.trim().is_empty()) {
        return Ok(FieldValue::Null(field_type));
    }

    match field_type {
        FieldType::Text => match value {
            Value::String(text) => Ok(FieldValue::Text(text.trim().to_string())),
            _ => Err(format!("{key} must be a string.")),
        },
        FieldType::Int => match value {
            Value::Number(number) if number.is_i64() => {
                Ok(FieldValue::Int(number.as_i64().unwrap_or_default()))
            }
            Value::String(text) => text
                .trim()
                .parse()
                .map(FieldValue::Int)
                .map_err(|_| format!("{key} must be an integer.")),
            _ => Err(format!("{key} must be an integer.")),
        },
        FieldType::Num => match value {
            Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Num)
                .ok_or_else(|| format!("{key} must be a number.")),
            Value::String(text) => text
                .trim()
                .parse()
                .map(FieldValue::Num)
                .map_err(|_| format!("{key} must be a number.")),
            _ => Err(format!("{key} must be a number.")),
        },
    }
}

/// Create policy: the identifier is generated by storage; a client-supplied
/// one is rejected outright.
pub fn validate_create(payload: &Value) -> ValidationResult {
    let normalized = validate(payload, &["lokacija"])?;
    if normalized.is_empty() {
        return Err(vec!["No data provided.".to_string()]);
    }
    if normalized.iter().any(|(key, _)| *key == "id") {
        return Err(vec![
            "ID must not be provided when creating. Remove id from the request body.".to_string(),
        ]);
    }
    Ok(normalized)
}

/// Update policy: a body id, when present, must match the path-addressed
/// identifier; it is stripped before clause building, and a payload left
/// empty after stripping is rejected.
pub fn validate_update(payload: &Value, path_id: i64) -> ValidationResult {
    let mut normalized = validate(payload, &[])?;
    if normalized.is_empty() {
        return Err(vec!["No data provided.".to_string()]);
    }

    if let Some(position) = normalized.iter().position(|(key, _)| *key == "id") {
        let matches_path = matches!(normalized[position].1, FieldValue::Int(id) if id == path_id);
        if !matches_path {
            return Err(vec![
                "ID in body does not match path parameter. Use the same id as in the URL."
                    .to_string(),
            ]);
        }
        normalized.remove(position);
        if normalized.is_empty() {
            return Err(vec![
                "No updatable fields provided. Provide at least one field to update.".to_string(),
            ]);
        }
    }

    Ok(normalized)
}

/// District foreign key from a normalized payload, when present and
/// non-null. The caller must verify it exists before writing; the store
/// only enforces it at commit time with a less specific error.
pub fn district_reference(payload: &NormalizedPayload) -> Option<i64> {
    payload.iter().find_map(|(key, value)| match (key, value) {
        (&"naziv_gc_id", FieldValue::Int(id)) => Some(*id),
        _ => None,
    })
}
