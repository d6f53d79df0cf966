//! Router builders.

mod api;
mod common;

pub use api::{api_routes, cors_layer};
pub use common::{common_routes, SERVICE_NAME};

use crate::state::AppState;
use axum::Router;
use tower_http::normalize_path::NormalizePath;

/// Every route the service exposes. A trailing slash is trimmed before routing, so
/// `/api/backup/` and `/api/backup` reach the same handler.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .merge(common_routes(state.clone()))
        .merge(api_routes(state));
    NormalizePath::trim_trailing_slash(router)
}
