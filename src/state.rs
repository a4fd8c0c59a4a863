use crate::{config::AppConfig, store::WellStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: WellStore,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: WellStore) -> Self {
        Self { config, store }
    }
}
