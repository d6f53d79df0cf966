//! CRUD for the lookup tables (programs, halls, wings).

use crate::error::AppError;
use crate::models::LookupRow;
use sqlx::PgPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    Program,
    Hall,
    Wing,
}

impl LookupKind {
    pub fn table(self) -> &'static str {
        match self {
            LookupKind::Program => "core_program",
            LookupKind::Hall => "core_hall",
            LookupKind::Wing => "core_wing",
        }
    }

    pub fn max_name_len(self) -> usize {
        match self {
            LookupKind::Program => 200,
            LookupKind::Hall | LookupKind::Wing => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LookupKind::Program => "program",
            LookupKind::Hall => "hall",
            LookupKind::Wing => "wing",
        }
    }
}

pub struct LookupService;

impl LookupService {
    /// All rows ordered by id.
    pub async fn list(pool: &PgPool, kind: LookupKind) -> Result<Vec<LookupRow>, AppError> {
        let sql = format!("SELECT id, name FROM \"{}\" ORDER BY id", kind.table());
        tracing::debug!(sql = %sql, "lookup list");
        Ok(sqlx::query_as(&sql).fetch_all(pool).await?)
    }

    pub async fn read(pool: &PgPool, kind: LookupKind, id: i64) -> Result<Option<LookupRow>, AppError> {
        let sql = format!("SELECT id, name FROM \"{}\" WHERE id = $1", kind.table());
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?)
    }

    /// Rows whose id is in `ids`, ordered by id.
    pub async fn read_many(pool: &PgPool, kind: LookupKind, ids: &[i64]) -> Result<Vec<LookupRow>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT id, name FROM \"{}\" WHERE id = ANY($1) ORDER BY id", kind.table());
        Ok(sqlx::query_as(&sql).bind(ids).fetch_all(pool).await?)
    }

    pub async fn create(pool: &PgPool, kind: LookupKind, name: &str) -> Result<LookupRow, AppError> {
        let sql = format!("INSERT INTO \"{}\" (name) VALUES ($1) RETURNING id, name", kind.table());
        tracing::debug!(sql = %sql, "lookup create");
        sqlx::query_as(&sql)
            .bind(name)
            .fetch_one(pool)
            .await
            .map_err(|e| AppError::from_db(e, kind.label()))
    }

    pub async fn update(pool: &PgPool, kind: LookupKind, id: i64, name: &str) -> Result<Option<LookupRow>, AppError> {
        let sql = format!("UPDATE \"{}\" SET name = $1 WHERE id = $2 RETURNING id, name", kind.table());
        sqlx::query_as(&sql)
            .bind(name)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::from_db(e, kind.label()))
    }

    /// `true` when a row was deleted.
    pub async fn delete(pool: &PgPool, kind: LookupKind, id: i64) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", kind.table());
        let res = sqlx::query(&sql)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| AppError::from_db(e, kind.label()))?;
        Ok(res.rows_affected() > 0)
    }
}
