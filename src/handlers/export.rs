//! Export downloads and the snapshot refresh action.

use crate::catalog::GRID_COLUMNS;
use crate::error::{Result, ServiceError};
use crate::export::{self, ExportFormat};
use crate::filters::parse_grid_query;
use crate::response;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::collections::HashMap;

/// `GET /api/resources/export?format={csv|json}`. Reuses the grid filter
/// grammar; `search` is accepted as an alias for `search[value]`.
pub async fn download(
    State(state): State<AppState>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Response> {
    if let Some(search) = params.remove("search") {
        params.insert("search[value]".to_string(), search);
    }
    let format = ExportFormat::parse(params.get("format").map(String::as_str).unwrap_or(""));
    let query = parse_grid_query(&params, GRID_COLUMNS.len());
    let rows = state.store.export_rows(&query).await?;

    match format {
        ExportFormat::Csv => {
            let payload = export::build_csv(&rows)?;
            Ok(attachment(payload, "text/csv", "wells_filtered.csv"))
        }
        ExportFormat::Json => {
            let payload = serde_json::to_string_pretty(&export::build_grouped_json(&rows))
                .map_err(|err| ServiceError::Internal(err.into()))?;
            Ok(attachment(
                payload,
                "application/json",
                "wells_filtered.json",
            ))
        }
    }
}

fn attachment(payload: String, content_type: &'static str, filename: &str) -> Response {
    let disposition = format!("attachment; filename={filename}");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            ),
        ],
        payload,
    )
        .into_response()
}

/// `POST /api/resources/snapshots`. The one login-gated maintenance action:
/// refreshes both on-disk snapshot artifacts from the full dataset.
pub async fn refresh_snapshots(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    enforce_api_key(&headers, &state)?;

    let rows = state.store.snapshot_rows().await?;
    let (csv_path, json_path) = export::write_snapshots(&state.config.snapshot_dir, &rows)?;

    Ok(response::ok(
        "Snapshots refreshed.",
        json!({
            "rows": rows.len(),
            "csv": csv_path.display().to_string(),
            "json": json_path.display().to_string(),
        }),
    ))
}

fn enforce_api_key(headers: &HeaderMap, state: &AppState) -> Result<()> {
    if let Some(expected) = &state.config.api_key {
        let provided = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Unauthorized);
        }
    }

    Ok(())
}
