//! Shared application state for all routes.

use crate::config::{Settings, StorageBackend};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    /// Resolved once from `settings` at startup.
    pub storage: StorageBackend,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let storage = StorageBackend::resolve(&settings);
        AppState {
            pool,
            settings: Arc::new(settings),
            storage,
        }
    }
}
