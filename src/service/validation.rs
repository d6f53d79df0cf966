//! Registration form validation.

use crate::error::AppError;
use crate::models::{EmergencyContact, NewStudent, StudentForm, GENDERS, MARITAL_STATUSES};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));

pub struct StudentValidator;

impl StudentValidator {
    /// Check every field and produce a typed registration. Stops at the first problem.
    pub fn validate(form: StudentForm) -> Result<NewStudent, AppError> {
        let first_name = required("first_name", form.first_name, 100)?;
        let last_name = required("last_name", form.last_name, 100)?;
        let other_name = optional("other_name", form.other_name, 100)?;
        let date_of_birth = parse_date("date_of_birth", &required("date_of_birth", form.date_of_birth, 10)?)?;
        let gender = choice("gender", &required("gender", form.gender, 10)?, GENDERS)?;
        let marital_status = choice(
            "marital_status",
            &required("marital_status", form.marital_status, 10)?,
            MARITAL_STATUSES,
        )?;
        let contact = required("contact", form.contact, 20)?;
        let email = required("email", form.email, 254)?;
        if !EMAIL_RE.is_match(&email) {
            return Err(AppError::Validation("email must be a valid email".into()));
        }
        let program_id = parse_id("program_id", &required("program_id", form.program_id, 20)?)?;
        let hall_id = parse_id("hall_id", &required("hall_id", form.hall_id, 20)?)?;
        let place_of_residence = required("place_of_residence", form.place_of_residence, 255)?;
        let mut wing_ids = Vec::with_capacity(form.wing_ids.len());
        for raw in &form.wing_ids {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let id = parse_id("wing_ids", raw)?;
            if !wing_ids.contains(&id) {
                wing_ids.push(id);
            }
        }
        let emergency_contact = match (
            optional("emergency_contact_data.name", form.emergency_contact_name, 200)?,
            optional("emergency_contact_data.phone", form.emergency_contact_phone, 20)?,
        ) {
            (Some(name), Some(phone)) => Some(EmergencyContact { name, phone }),
            (None, None) => None,
            (Some(_), None) => return Err(AppError::Validation("emergency_contact_data.phone is required".into())),
            (None, Some(_)) => return Err(AppError::Validation("emergency_contact_data.name is required".into())),
        };

        Ok(NewStudent {
            first_name,
            last_name,
            other_name,
            date_of_birth,
            gender,
            marital_status,
            contact,
            email,
            program_id,
            hall_id,
            place_of_residence,
            wing_ids,
            emergency_contact,
        })
    }
}

/// Lookup names: required, trimmed, bounded.
pub fn validate_name(value: Option<String>, max: usize) -> Result<String, AppError> {
    required("name", value, max)
}

fn required(field: &str, value: Option<String>, max: usize) -> Result<String, AppError> {
    optional(field, value, max)?.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn optional(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, AppError> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if let Some(v) = &value {
        if v.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }
    Ok(value)
}

fn choice(field: &str, value: &str, allowed: &[&str]) -> Result<String, AppError> {
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(AppError::Validation(format!("{} must be one of: {}", field, allowed.join(", "))))
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{} must be a date in YYYY-MM-DD format", field)))
}

fn parse_id(field: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::Validation(format!("{} must contain positive integer ids", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> StudentForm {
        StudentForm {
            first_name: Some("Ama".into()),
            last_name: Some("Mensah".into()),
            date_of_birth: Some("2002-03-14".into()),
            gender: Some("Female".into()),
            marital_status: Some("Single".into()),
            contact: Some("0241234567".into()),
            email: Some("ama@example.com".into()),
            program_id: Some("1".into()),
            hall_id: Some("4".into()),
            place_of_residence: Some("Accra".into()),
            wing_ids: vec!["2".into(), "3".into(), "2".into()],
            emergency_contact_name: Some("Kofi Mensah".into()),
            emergency_contact_phone: Some("0200000000".into()),
            ..StudentForm::default()
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_form_becomes_new_student() {
        let s = StudentValidator::validate(form()).unwrap();
        assert_eq!(s.first_name, "Ama");
        assert_eq!(s.date_of_birth, NaiveDate::from_ymd_opt(2002, 3, 14).unwrap());
        assert_eq!(s.marital_status, "Single");
        assert_eq!(s.program_id, 1);
        assert_eq!(s.hall_id, 4);
        assert_eq!(s.wing_ids, vec![2, 3]);
        assert_eq!(
            s.emergency_contact,
            Some(EmergencyContact {
                name: "Kofi Mensah".into(),
                phone: "0200000000".into()
            })
        );
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut f = form();
        f.last_name = Some("   ".into());
        assert_eq!(message(StudentValidator::validate(f).unwrap_err()), "last_name is required");
    }

    #[test]
    fn program_hall_and_marital_status_are_required() {
        let mut f = form();
        f.program_id = None;
        assert_eq!(message(StudentValidator::validate(f).unwrap_err()), "program_id is required");
        let mut f = form();
        f.hall_id = Some(" ".into());
        assert_eq!(message(StudentValidator::validate(f).unwrap_err()), "hall_id is required");
        let mut f = form();
        f.marital_status = None;
        assert_eq!(message(StudentValidator::validate(f).unwrap_err()), "marital_status is required");
        let mut f = form();
        f.hall_id = Some("0".into());
        assert!(message(StudentValidator::validate(f).unwrap_err()).starts_with("hall_id must contain"));
    }

    #[test]
    fn choices_are_enforced() {
        let mut f = form();
        f.gender = Some("Other".into());
        assert!(message(StudentValidator::validate(f).unwrap_err()).starts_with("gender must be one of"));
        let mut f = form();
        f.marital_status = Some("Widowed".into());
        assert_eq!(StudentValidator::validate(f).unwrap().marital_status, "Widowed");
    }

    #[test]
    fn email_and_date_shapes_are_checked() {
        let mut f = form();
        f.email = Some("not-an-email".into());
        assert_eq!(message(StudentValidator::validate(f).unwrap_err()), "email must be a valid email");
        for bad in ["a b@example.com", "ama@example", "@example.com"] {
            let mut f = form();
            f.email = Some(bad.into());
            assert!(StudentValidator::validate(f).is_err(), "{}", bad);
        }
        assert!(EMAIL_RE.is_match("kofi.mensah+nups@school.edu.gh"));
        let mut f = form();
        f.date_of_birth = Some("14/03/2002".into());
        assert!(message(StudentValidator::validate(f).unwrap_err()).contains("YYYY-MM-DD"));
    }

    #[test]
    fn lengths_and_ids_are_bounded() {
        let mut f = form();
        f.contact = Some("0".repeat(21));
        assert_eq!(
            message(StudentValidator::validate(f).unwrap_err()),
            "contact must be at most 20 characters"
        );
        let mut f = form();
        f.wing_ids = vec!["abc".into()];
        assert!(StudentValidator::validate(f).is_err());
        assert!(validate_name(Some("x".repeat(101)), 100).is_err());
        assert_eq!(validate_name(Some(" Volta ".into()), 100).unwrap(), "Volta");
    }

    #[test]
    fn half_an_emergency_contact_is_rejected() {
        let mut f = form();
        f.emergency_contact_phone = None;
        assert_eq!(
            message(StudentValidator::validate(f).unwrap_err()),
            "emergency_contact_data.phone is required"
        );
    }
}
