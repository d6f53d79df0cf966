//! NUPS registration API: lookups, student registration and schema-driven SQL backups.

pub mod backup;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod media;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use backup::{generate_backup, BackupOptions, BackupScript};
pub use config::{Settings, StorageBackend};
pub use error::{AppError, BackupError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one};
pub use routes::{api_routes, app, common_routes};
pub use state::AppState;
pub use store::ensure_database_exists;
