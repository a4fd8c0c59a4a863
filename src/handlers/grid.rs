//! Grid surface: the DataTables-style listing endpoint.

use crate::catalog::GRID_COLUMNS;
use crate::error::Result;
use crate::filters::parse_grid_query;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;

/// `GET /api/resources`. Bad filter input never fails the request; it
/// degrades to an unfiltered (or less filtered) page.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>> {
    let query = parse_grid_query(&params, GRID_COLUMNS.len());
    let page = state.store.grid_page(&query).await?;

    Ok(Json(json!({
        "draw": query.draw,
        "recordsTotal": page.total,
        "recordsFiltered": page.filtered,
        "data": page.rows,
    })))
}
