//! Program, hall and wing CRUD. The lookup kind comes from the router as an `Extension`.

use crate::error::AppError;
use crate::models::LookupInput;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{validate_name, LookupKind, LookupService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("invalid id".into()))
}

fn not_found(kind: LookupKind, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", kind.label(), id))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
) -> Result<impl IntoResponse, AppError> {
    let rows = LookupService::list(&state.pool, kind).await?;
    Ok(success_many(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Json(body): Json<LookupInput>,
) -> Result<impl IntoResponse, AppError> {
    let name = validate_name(body.name, kind.max_name_len())?;
    let row = LookupService::create(&state.pool, kind, &name).await?;
    tracing::info!(kind = kind.label(), id = row.id, "lookup created");
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let row = LookupService::read(&state.pool, kind, id)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    Ok(success_one_ok(row))
}

/// Serves both PUT and PATCH: the only writable field is `name`.
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<String>,
    Json(body): Json<LookupInput>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let name = validate_name(body.name, kind.max_name_len())?;
    let row = LookupService::update(&state.pool, kind, id, &name)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<LookupKind>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    if !LookupService::delete(&state.pool, kind, id).await? {
        return Err(not_found(kind, id));
    }
    tracing::info!(kind = kind.label(), id, "lookup deleted");
    Ok(StatusCode::NO_CONTENT)
}
