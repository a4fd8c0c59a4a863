//! Outbound response shaping: the `{status, message, response}` envelope
//! shared by every API route, and the semantic enrichment attached to
//! single resources.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

/// Builds the standard envelope. `status` carries the HTTP reason phrase so
/// clients can log a body without consulting transport metadata.
pub fn envelope(status: StatusCode, message: &str, response: Value) -> Response {
    let body = json!({
        "status": status.canonical_reason().unwrap_or("Unknown"),
        "message": message,
        "response": response,
    });
    (status, Json(body)).into_response()
}

pub fn ok(message: &str, response: Value) -> Response {
    envelope(StatusCode::OK, message, response)
}

pub fn created(message: &str, response: Value) -> Response {
    envelope(StatusCode::CREATED, message, response)
}

/// Collection wrapper with paging metadata. `total` is the filtered count
/// across all pages, not the page size.
pub fn collection(items: Vec<Value>, limit: i64, offset: i64, total: i64) -> Value {
    json!({ "items": items, "limit": limit, "offset": offset, "total": total })
}

fn semantic_context() -> Value {
    json!({
        "@vocab": "https://schema.org/",
        "lokacija": "address",
        "lat": "latitude",
        "lon": "longitude",
    })
}

const SEMANTIC_TYPE: &str = "https://schema.org/Place";

/// Merges the JSON-LD context and type into a resource object. The input is
/// copied, never mutated; non-objects pass through untouched.
pub fn with_semantics(item: &Value) -> Value {
    let Some(fields) = item.as_object() else {
        return item.clone();
    };

    let mut enriched: Map<String, Value> = fields.clone();
    enriched.insert("@context".to_string(), semantic_context());
    enriched.insert("@type".to_string(), Value::String(SEMANTIC_TYPE.to_string()));
    Value::Object(enriched)
}

pub fn with_semantics_list(items: &[Value]) -> Vec<Value> {
    items.iter().map(with_semantics).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn semantics_merge_does_not_mutate_source() {
        let record = json!({ "lokacija": "Trg 1", "lat": 45.8 });
        let enriched = with_semantics(&record);

        assert_eq!(enriched["@type"], "https://schema.org/Place");
        assert_eq!(enriched["@context"]["lat"], "latitude");
        assert_eq!(enriched["lokacija"], "Trg 1");
        assert!(record.get("@type").is_none());
    }

    #[test]
    fn semantics_pass_non_objects_through() {
        assert_eq!(with_semantics(&json!(42)), json!(42));
    }

    #[test]
    fn collection_carries_paging_metadata() {
        let wrapped = collection(vec![json!({"id": 1})], 50, 10, 321);
        assert_eq!(wrapped["limit"], 50);
        assert_eq!(wrapped["offset"], 10);
        assert_eq!(wrapped["total"], 321);
        assert_eq!(wrapped["items"].as_array().unwrap().len(), 1);
    }
}
