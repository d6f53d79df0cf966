//! Database backup download.

use crate::backup::{generate_backup, BackupOptions};
use crate::extractors::AuthUser;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// GET /api/backup. Streams a `.sql` attachment; any failure is a uniform 500.
pub async fn download(AuthUser(claims): AuthUser, State(state): State<AppState>) -> Response {
    tracing::info!(user = ?claims.user_id, "backup requested");
    let options = BackupOptions::from_settings(&state.settings);
    match generate_backup(&state.pool, &options, &state.storage).await {
        Ok(script) => {
            let disposition = format!("attachment; filename=\"{}\"", script.filename);
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"backup.sql\""));
            let length = script.content.len();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("application/sql")),
                    (header::CONTENT_DISPOSITION, disposition),
                    (header::CONTENT_LENGTH, HeaderValue::from(length)),
                ],
                script.content,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "backup failed");
            e.into_response()
        }
    }
}
