pub mod catalog;
pub mod clause;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filters;
pub mod handlers;
pub mod payload;
pub mod response;
pub mod server;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the well registry service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).await?.run().await
}
