//! `/api` routes: lookups, students and backup.

use crate::config::Settings;
use crate::handlers::{backup, lookup, student};
use crate::service::LookupKind;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Extension, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

fn lookup_routes(kind: LookupKind) -> Router<AppState> {
    Router::new()
        .route("/", get(lookup::list).post(lookup::create))
        .route(
            "/:id",
            get(lookup::read)
                .put(lookup::update)
                .patch(lookup::update)
                .delete(lookup::delete),
        )
        .layer(Extension(kind))
}

/// CORS from settings: any origin when unset, otherwise the configured list.
pub fn cors_layer(settings: &Settings) -> CorsLayer {
    let origin = match &settings.cors_allowed_origins {
        None => AllowOrigin::from(Any),
        Some(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };
    CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any)
}

pub fn api_routes(state: AppState) -> Router {
    let max_body = state.settings.max_upload_bytes;
    let cors = cors_layer(&state.settings);
    Router::new()
        .route("/api/backup", get(backup::download))
        .route("/api/students", get(student::list).post(student::create))
        .route("/api/students/:id", get(student::read))
        .nest("/api/programs", lookup_routes(LookupKind::Program))
        .nest("/api/halls", lookup_routes(LookupKind::Hall))
        .nest("/api/wings", lookup_routes(LookupKind::Wing))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors)
        .with_state(state)
}
