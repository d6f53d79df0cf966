//! Application tables. Every statement is `IF NOT EXISTS`, so startup can run it each time.
//! Order follows foreign keys: lookups, then profiles, then the tables pointing at profiles.

use crate::error::AppError;
use sqlx::PgPool;

const LOOKUP_TABLES: &[(&str, u32)] = &[("core_program", 200), ("core_hall", 100), ("core_wing", 100)];

const STUDENT_PROFILE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS "core_studentprofile" (
        "id" BIGSERIAL PRIMARY KEY,
        "first_name" VARCHAR(100) NOT NULL,
        "last_name" VARCHAR(100) NOT NULL,
        "other_name" VARCHAR(100),
        "date_of_birth" DATE NOT NULL,
        "gender" VARCHAR(10) NOT NULL,
        "marital_status" VARCHAR(10) NOT NULL,
        "contact" VARCHAR(20) NOT NULL,
        "email" VARCHAR(254) NOT NULL UNIQUE,
        "program_id" BIGINT REFERENCES "core_program" ("id") ON DELETE SET NULL,
        "place_of_residence" VARCHAR(255) NOT NULL,
        "hall_of_affiliation_id" BIGINT REFERENCES "core_hall" ("id") ON DELETE SET NULL,
        "id_picture" VARCHAR(100),
        "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const STUDENT_WINGS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS "core_studentprofile_wings" (
        "id" BIGSERIAL PRIMARY KEY,
        "studentprofile_id" BIGINT NOT NULL REFERENCES "core_studentprofile" ("id") ON DELETE CASCADE,
        "wing_id" BIGINT NOT NULL REFERENCES "core_wing" ("id") ON DELETE CASCADE,
        UNIQUE ("studentprofile_id", "wing_id")
    )
"#;

const EMERGENCY_CONTACT_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS "core_emergencycontact" (
        "id" BIGSERIAL PRIMARY KEY,
        "student_id" BIGINT NOT NULL UNIQUE REFERENCES "core_studentprofile" ("id") ON DELETE CASCADE,
        "name" VARCHAR(200) NOT NULL,
        "phone" VARCHAR(20) NOT NULL
    )
"#;

fn lookup_ddl(table: &str, max_len: u32) -> String {
    format!(
        r#"
    CREATE TABLE IF NOT EXISTS "{}" (
        "id" BIGSERIAL PRIMARY KEY,
        "name" VARCHAR({}) NOT NULL UNIQUE
    )
"#,
        table, max_len
    )
}

/// All DDL in execution order.
pub fn migration_statements() -> Vec<String> {
    let mut stmts: Vec<String> = LOOKUP_TABLES.iter().map(|(t, n)| lookup_ddl(t, *n)).collect();
    stmts.push(STUDENT_PROFILE_DDL.to_string());
    stmts.push(STUDENT_WINGS_DDL.to_string());
    stmts.push(EMERGENCY_CONTACT_DDL.to_string());
    stmts
}

pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    let stmts = migration_statements();
    for sql in &stmts {
        sqlx::query(sql).execute(pool).await?;
    }
    tracing::info!(statements = stmts.len(), "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_tables_are_created_first() {
        let stmts = migration_statements();
        let created = |name: &str| {
            stmts
                .iter()
                .position(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS \"{}\"", name)))
                .unwrap()
        };
        assert!(created("core_program") < created("core_studentprofile"));
        assert!(created("core_hall") < created("core_studentprofile"));
        assert!(created("core_wing") < created("core_studentprofile_wings"));
        assert!(created("core_studentprofile") < created("core_studentprofile_wings"));
        assert!(created("core_studentprofile") < created("core_emergencycontact"));
    }

    #[test]
    fn lookup_names_are_unique_and_bounded() {
        let ddl = lookup_ddl("core_program", 200);
        assert!(ddl.contains("\"name\" VARCHAR(200) NOT NULL UNIQUE"));
    }

    #[test]
    fn marital_status_has_no_default() {
        assert!(STUDENT_PROFILE_DDL.contains("\"marital_status\" VARCHAR(10) NOT NULL,"));
        assert!(!STUDENT_PROFILE_DDL.contains("DEFAULT 'Single'"));
    }
}
