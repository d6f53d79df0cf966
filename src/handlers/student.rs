//! Student registration (public multipart form) and admin retrieval.

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::handlers::lookup::parse_id;
use crate::media::{save_id_picture, PictureUrls};
use crate::models::StudentForm;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{StudentService, StudentValidator};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};

/// An uploaded file held in memory until the form validates.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Record one text field. Unknown names are ignored; `wing_ids` may repeat.
fn apply_field(form: &mut StudentForm, name: &str, value: String) {
    let slot = match name {
        "first_name" => &mut form.first_name,
        "last_name" => &mut form.last_name,
        "other_name" => &mut form.other_name,
        "date_of_birth" => &mut form.date_of_birth,
        "gender" => &mut form.gender,
        "marital_status" => &mut form.marital_status,
        "contact" => &mut form.contact,
        "email" => &mut form.email,
        "program_id" => &mut form.program_id,
        "hall_id" => &mut form.hall_id,
        "place_of_residence" => &mut form.place_of_residence,
        "emergency_contact_data.name" => &mut form.emergency_contact_name,
        "emergency_contact_data.phone" => &mut form.emergency_contact_phone,
        "wing_ids" | "wing_ids[]" => {
            // Accept both repeated fields and a single comma-separated value.
            form.wing_ids.extend(value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
            return;
        }
        _ => return,
    };
    *slot = Some(value);
}

/// POST /api/students. Open to anyone.
pub async fn create(State(state): State<AppState>, mut multipart: Multipart) -> Result<impl IntoResponse, AppError> {
    let mut form = StudentForm::default();
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "id_picture" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("id_picture: {}", e)))?;
            if !bytes.is_empty() {
                upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("{}: {}", name, e)))?;
        apply_field(&mut form, &name, value);
    }

    let student = StudentValidator::validate(form)?;
    let stored = match &upload {
        Some(u) => Some(save_id_picture(&state.settings.media_root, &u.file_name, &u.bytes).await?),
        None => None,
    };
    match StudentService::create(&state.pool, &PictureUrls::from_state(&state), &student, stored.as_deref()).await {
        Ok(view) => Ok(success_one(view)),
        Err(e) => {
            if let Some(path) = &stored {
                if let Err(io) = tokio::fs::remove_file(state.settings.media_root.join(path)).await {
                    tracing::warn!(path = %path, error = %io, "orphaned upload not removed");
                }
            }
            Err(e)
        }
    }
}

/// GET /api/students. Newest first.
pub async fn list(_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let students = StudentService::list(&state.pool, &PictureUrls::from_state(&state)).await?;
    Ok(success_many(students))
}

pub async fn read(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let student = StudentService::read(&state.pool, &PictureUrls::from_state(&state), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("student {}", id)))?;
    Ok(success_one_ok(student))
}
