//! Rows read from the application tables and the shapes returned to clients.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const GENDERS: &[&str] = &["Male", "Female"];
pub const MARITAL_STATUSES: &[&str] = &["Single", "Married", "Divorced", "Widowed"];

/// Program, hall or wing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct LookupRow {
    pub id: i64,
    pub name: String,
}

/// Body of lookup create/update requests.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LookupInput {
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub other_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub marital_status: String,
    pub contact: String,
    pub email: String,
    pub program_id: Option<i64>,
    pub place_of_residence: String,
    pub hall_of_affiliation_id: Option<i64>,
    pub id_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw registration form as submitted. Everything is optional until validated.
#[derive(Clone, Debug, Default)]
pub struct StudentForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub program_id: Option<String>,
    pub hall_id: Option<String>,
    pub place_of_residence: Option<String>,
    pub wing_ids: Vec<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// A validated registration, ready to insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub other_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub marital_status: String,
    pub contact: String,
    pub email: String,
    pub program_id: i64,
    pub hall_id: i64,
    pub place_of_residence: String,
    pub wing_ids: Vec<i64>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Student as returned by the API, with related rows nested.
#[derive(Clone, Debug, Serialize)]
pub struct StudentView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub other_name: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub marital_status: String,
    pub contact: String,
    pub email: String,
    pub program: Option<LookupRow>,
    pub hall: Option<LookupRow>,
    pub place_of_residence: String,
    pub wings: Vec<LookupRow>,
    pub emergency_contact: Option<EmergencyContact>,
    /// Fetchable URL of the ID picture.
    pub id_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}
