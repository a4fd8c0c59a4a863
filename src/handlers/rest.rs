//! REST surface: the versioned resource collection and detail API.

use crate::error::{Result, ServiceError};
use crate::filters::{parse_paging, parse_rest_query};
use crate::payload::{self, district_reference};
use crate::response;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde_json::{json, Value};
use std::collections::HashMap;

/// `GET /api/v1/resources`.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let query = parse_rest_query(&params)?;
    let (total, items) = state.store.rest_list(&query).await?;

    Ok(response::ok(
        "Fetched well collection.",
        response::collection(
            response::with_semantics_list(&items),
            query.limit,
            query.offset,
            total,
        ),
    ))
}

/// `GET /api/v1/resources/{id}`.
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let record = state.store.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(response::ok("Fetched well.", response::with_semantics(&record)))
}

/// `POST /api/v1/resources`.
pub async fn create(State(state): State<AppState>, body: Option<axum::Json<Value>>) -> Result<Response> {
    let body = body.map(|json| json.0).unwrap_or(Value::Null);
    let normalized = payload::validate_create(&body).map_err(ServiceError::Validation)?;

    ensure_district_exists(&state, district_reference(&normalized)).await?;

    let record = state.store.create(&normalized).await?;
    Ok(response::created(
        "Well created.",
        response::with_semantics(&record),
    ))
}

/// `PUT /api/v1/resources/{id}`. Partial update.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<axum::Json<Value>>,
) -> Result<Response> {
    let body = body.map(|json| json.0).unwrap_or(Value::Null);
    let normalized = payload::validate_update(&body, id).map_err(ServiceError::Validation)?;

    ensure_district_exists(&state, district_reference(&normalized)).await?;

    let record = state.store.update(id, &normalized).await?;
    Ok(response::ok("Well updated.", response::with_semantics(&record)))
}

/// `DELETE /api/v1/resources/{id}`.
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    state.store.delete(id).await?;
    Ok(response::ok("Well deleted.", json!({ "id": id })))
}

/// `GET /api/v1/resources/statuses`.
pub async fn statuses(State(state): State<AppState>) -> Result<Response> {
    let items = state.store.status_summary().await?;
    Ok(response::ok(
        "Fetched status summary.",
        json!({ "items": response::with_semantics_list(&items) }),
    ))
}

/// `GET /api/v1/resources/coordinates`. Only rows with both coordinates.
pub async fn coordinates(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response> {
    let (limit, offset) = parse_paging(&params)?;
    let items = state.store.coordinates(limit, offset).await?;
    Ok(response::ok(
        "Fetched coordinate list.",
        json!({
            "items": response::with_semantics_list(&items),
            "limit": limit,
            "offset": offset,
        }),
    ))
}

/// `GET /api/v1/districts`.
pub async fn districts(State(state): State<AppState>) -> Result<Response> {
    let items = state.store.districts().await?;
    Ok(response::ok("Fetched city districts.", json!({ "items": items })))
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Well {id} not found."))
}

/// The store enforces the foreign key only at commit time with a less
/// specific error, so a live existence check runs first.
async fn ensure_district_exists(state: &AppState, district_id: Option<i64>) -> Result<()> {
    let Some(district_id) = district_id else {
        return Ok(());
    };
    if state.store.district_exists(district_id).await? {
        Ok(())
    } else {
        Err(ServiceError::Validation(vec![format!(
            "naziv_gc_id {district_id} does not exist."
        )]))
    }
}
