use crate::{
    config::AppConfig,
    db,
    error::ServiceError,
    handlers::{export, grid, rest},
    state::AppState,
    store::WellStore,
};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect_pool(&config).await?;
        let config = Arc::new(config);
        let store = WellStore::new(pool);
        let state = AppState::new(Arc::clone(&config), store);

        Ok(Self { config, state })
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/resources", get(grid::list))
            .route("/api/resources/export", get(export::download))
            .route("/api/resources/snapshots", post(export::refresh_snapshots))
            .route("/api/v1/resources", get(rest::list).post(rest::create))
            .route("/api/v1/resources/statuses", get(rest::statuses))
            .route("/api/v1/resources/coordinates", get(rest::coordinates))
            .route(
                "/api/v1/resources/:id",
                get(rest::get).put(rest::update).delete(rest::delete),
            )
            .route("/api/v1/districts", get(rest::districts))
            .with_state(self.state.clone())
            .layer(middleware::from_fn(map_unsupported_methods))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "well registry listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }
}

/// The API contract maps unsupported methods to 501, not the conventional
/// 405. Preserved as-is: changing it is an API-contract decision.
async fn map_unsupported_methods(request: Request, next: Next) -> Response {
    let api_path = request.uri().path().starts_with("/api/");
    let response = next.run(request).await;

    if api_path && response.status() == StatusCode::METHOD_NOT_ALLOWED {
        return ServiceError::NotImplemented.into_response();
    }

    response
}
