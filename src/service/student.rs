//! Student registration and retrieval.

use crate::error::AppError;
use crate::media::PictureUrls;
use crate::models::{EmergencyContact, LookupRow, NewStudent, StudentRow, StudentView};
use crate::service::lookup::{LookupKind, LookupService};
use sqlx::PgPool;
use std::collections::HashMap;

const STUDENT_COLUMNS: &str = "id, first_name, last_name, other_name, date_of_birth, gender, marital_status, \
     contact, email, program_id, place_of_residence, hall_of_affiliation_id, id_picture, created_at";

/// Related rows for a batch of students, keyed for assembly.
#[derive(Default)]
pub struct Related {
    pub programs: HashMap<i64, LookupRow>,
    pub halls: HashMap<i64, LookupRow>,
    pub wings: HashMap<i64, Vec<LookupRow>>,
    pub contacts: HashMap<i64, EmergencyContact>,
}

pub struct StudentService;

impl StudentService {
    /// Insert the profile, its wings and its emergency contact in one transaction.
    /// `id_picture` is the stored relative name of an already saved upload.
    pub async fn create(
        pool: &PgPool,
        pictures: &PictureUrls<'_>,
        student: &NewStudent,
        id_picture: Option<&str>,
    ) -> Result<StudentView, AppError> {
        Self::check_references(pool, student).await?;

        let mut tx = pool.begin().await?;
        let sql = format!(
            "INSERT INTO \"core_studentprofile\" (first_name, last_name, other_name, date_of_birth, gender, \
             marital_status, contact, email, program_id, place_of_residence, hall_of_affiliation_id, id_picture) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            STUDENT_COLUMNS
        );
        tracing::debug!(sql = %sql, "student insert");
        let row: StudentRow = sqlx::query_as(&sql)
            .bind(&student.first_name)
            .bind(&student.last_name)
            .bind(&student.other_name)
            .bind(student.date_of_birth)
            .bind(&student.gender)
            .bind(&student.marital_status)
            .bind(&student.contact)
            .bind(&student.email)
            .bind(student.program_id)
            .bind(&student.place_of_residence)
            .bind(student.hall_id)
            .bind(id_picture)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::from_db(e, "student with this email"))?;

        for wing_id in &student.wing_ids {
            sqlx::query("INSERT INTO \"core_studentprofile_wings\" (studentprofile_id, wing_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(wing_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::from_db(e, "wing"))?;
        }
        if let Some(contact) = &student.emergency_contact {
            sqlx::query("INSERT INTO \"core_emergencycontact\" (student_id, name, phone) VALUES ($1, $2, $3)")
                .bind(row.id)
                .bind(&contact.name)
                .bind(&contact.phone)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::from_db(e, "emergency contact"))?;
        }
        tx.commit().await?;
        tracing::info!(student_id = row.id, wings = student.wing_ids.len(), "student registered");

        let mut views = Self::hydrate(pool, pictures, vec![row]).await?;
        views.pop().ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Newest registrations first.
    pub async fn list(pool: &PgPool, pictures: &PictureUrls<'_>) -> Result<Vec<StudentView>, AppError> {
        let sql = format!(
            "SELECT {} FROM \"core_studentprofile\" ORDER BY created_at DESC, id DESC",
            STUDENT_COLUMNS
        );
        tracing::debug!(sql = %sql, "student list");
        let rows: Vec<StudentRow> = sqlx::query_as(&sql).fetch_all(pool).await?;
        Self::hydrate(pool, pictures, rows).await
    }

    pub async fn read(pool: &PgPool, pictures: &PictureUrls<'_>, id: i64) -> Result<Option<StudentView>, AppError> {
        let sql = format!("SELECT {} FROM \"core_studentprofile\" WHERE id = $1", STUDENT_COLUMNS);
        let row: Option<StudentRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
        match row {
            Some(row) => Ok(Self::hydrate(pool, pictures, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn check_references(pool: &PgPool, student: &NewStudent) -> Result<(), AppError> {
        if LookupService::read(pool, LookupKind::Program, student.program_id).await?.is_none() {
            return Err(AppError::Validation(format!("program {} does not exist", student.program_id)));
        }
        if LookupService::read(pool, LookupKind::Hall, student.hall_id).await?.is_none() {
            return Err(AppError::Validation(format!("hall {} does not exist", student.hall_id)));
        }
        let found = LookupService::read_many(pool, LookupKind::Wing, &student.wing_ids).await?;
        if let Some(missing) = student.wing_ids.iter().find(|id| !found.iter().any(|w| w.id == **id)) {
            return Err(AppError::Validation(format!("wing {} does not exist", missing)));
        }
        Ok(())
    }

    /// Batch-load related rows and build views, keeping the order of `rows`.
    async fn hydrate(
        pool: &PgPool,
        pictures: &PictureUrls<'_>,
        rows: Vec<StudentRow>,
    ) -> Result<Vec<StudentView>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let program_ids: Vec<i64> = rows.iter().filter_map(|r| r.program_id).collect();
        let hall_ids: Vec<i64> = rows.iter().filter_map(|r| r.hall_of_affiliation_id).collect();

        let mut related = Related::default();
        for p in LookupService::read_many(pool, LookupKind::Program, &program_ids).await? {
            related.programs.insert(p.id, p);
        }
        for h in LookupService::read_many(pool, LookupKind::Hall, &hall_ids).await? {
            related.halls.insert(h.id, h);
        }

        let wing_rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT sw.studentprofile_id, w.id, w.name \
             FROM \"core_studentprofile_wings\" sw \
             JOIN \"core_wing\" w ON w.id = sw.wing_id \
             WHERE sw.studentprofile_id = ANY($1) \
             ORDER BY w.id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        for (student_id, id, name) in wing_rows {
            related.wings.entry(student_id).or_default().push(LookupRow { id, name });
        }

        let contact_rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT student_id, name, phone FROM \"core_emergencycontact\" WHERE student_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;
        for (student_id, name, phone) in contact_rows {
            related.contacts.insert(student_id, EmergencyContact { name, phone });
        }

        let mut picture_urls = Vec::with_capacity(rows.len());
        for r in &rows {
            picture_urls.push(match r.id_picture.as_deref() {
                Some(stored) => pictures.resolve(stored).await,
                None => None,
            });
        }

        Ok(rows
            .into_iter()
            .zip(picture_urls)
            .map(|(r, url)| assemble(r, &mut related, url))
            .collect())
    }
}

/// Build one view around an already resolved picture URL. Wings and contact are moved out
/// of `related`; lookups are cloned.
pub fn assemble(row: StudentRow, related: &mut Related, id_picture: Option<String>) -> StudentView {
    StudentView {
        id: row.id,
        program: row.program_id.and_then(|id| related.programs.get(&id).cloned()),
        hall: row.hall_of_affiliation_id.and_then(|id| related.halls.get(&id).cloned()),
        wings: related.wings.remove(&row.id).unwrap_or_default(),
        emergency_contact: related.contacts.remove(&row.id),
        first_name: row.first_name,
        last_name: row.last_name,
        other_name: row.other_name,
        date_of_birth: row.date_of_birth,
        gender: row.gender,
        marital_status: row.marital_status,
        contact: row.contact,
        email: row.email,
        place_of_residence: row.place_of_residence,
        id_picture,
        created_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn row(id_picture: Option<&str>) -> StudentRow {
        StudentRow {
            id: 7,
            first_name: "Ama".into(),
            last_name: "Mensah".into(),
            other_name: None,
            date_of_birth: NaiveDate::from_ymd_opt(2002, 3, 14).unwrap(),
            gender: "Female".into(),
            marital_status: "Single".into(),
            contact: "0241234567".into(),
            email: "ama@example.com".into(),
            program_id: Some(1),
            place_of_residence: "Accra".into(),
            hall_of_affiliation_id: Some(9),
            id_picture: id_picture.map(String::from),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn related() -> Related {
        let mut r = Related::default();
        r.programs.insert(1, LookupRow { id: 1, name: "Nursing".into() });
        r.wings.insert(
            7,
            vec![LookupRow { id: 2, name: "East".into() }, LookupRow { id: 3, name: "West".into() }],
        );
        r.contacts.insert(
            7,
            EmergencyContact {
                name: "Kofi".into(),
                phone: "0200000000".into(),
            },
        );
        r
    }

    #[test]
    fn view_nests_related_rows() {
        let v = assemble(
            row(Some("id_pictures/a.png")),
            &mut related(),
            Some("/media/id_pictures/a.png".into()),
        );
        assert_eq!(v.program.as_ref().map(|p| p.name.as_str()), Some("Nursing"));
        // Hall 9 was not loaded.
        assert!(v.hall.is_none());
        assert_eq!(v.wings.len(), 2);
        assert_eq!(v.emergency_contact.as_ref().map(|c| c.name.as_str()), Some("Kofi"));
        assert_eq!(v.id_picture.as_deref(), Some("/media/id_pictures/a.png"));
    }

    #[test]
    fn view_serializes_nested_shape() {
        let mut rel = related();
        rel.halls.insert(9, LookupRow { id: 9, name: "Volta".into() });
        let v = serde_json::to_value(assemble(row(None), &mut rel, None)).unwrap();
        assert_eq!(v["date_of_birth"], "2002-03-14");
        assert_eq!(v["hall"], serde_json::json!({"id": 9, "name": "Volta"}));
        assert!(v.get("hall_of_affiliation").is_none());
        assert_eq!(v["program"]["name"], "Nursing");
        assert!(v["id_picture"].is_null());

        let v = serde_json::to_value(assemble(row(None), &mut Related::default(), None)).unwrap();
        assert_eq!(v["wings"], serde_json::json!([]));
        assert!(v["program"].is_null());
        assert!(v["hall"].is_null());
    }
}
