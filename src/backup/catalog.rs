//! Read table, column and key metadata for application tables from `information_schema`,
//! with foreign keys taken from `pg_constraint`. Catalog columns are domain types
//! (`sql_identifier`, `cardinal_number`), so every selected value is cast to a plain type
//! before decoding.

use crate::error::BackupError;
use sqlx::PgPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// `information_schema.columns.data_type`, e.g. `character varying`.
    pub data_type: String,
    pub max_length: Option<i32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub is_identity: bool,
}

impl ColumnDescriptor {
    /// Column with no length, default or precision. Mostly for tests and fixtures.
    pub fn new(name: &str, data_type: &str, nullable: bool) -> Self {
        ColumnDescriptor {
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length: None,
            nullable,
            default: None,
            numeric_precision: None,
            numeric_scale: None,
            is_identity: false,
        }
    }

    /// Backed by a sequence or identity: spelled as a serial type on restore.
    pub fn is_auto_increment(&self) -> bool {
        self.is_identity
            || self
                .default
                .as_deref()
                .map(|d| d.trim_start().starts_with("nextval("))
                .unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub constraint_name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// `CASCADE`, `SET NULL`, ... `None` when the catalog reports nothing.
    pub delete_rule: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub constraint_name: String,
    /// In key order.
    pub columns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// In key order.
    pub primary_key: Vec<String>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    /// Column used to order rows in the data section.
    pub fn order_column(&self) -> Option<&str> {
        if self.column("id").is_some() {
            Some("id")
        } else {
            self.primary_key.first().map(String::as_str)
        }
    }
}

/// Every base table in `schema` whose name starts with `prefix`, sorted by name.
pub async fn read_catalog(pool: &PgPool, schema: &str, prefix: &str) -> Result<Vec<TableDescriptor>, BackupError> {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::new();
    for (name,) in names.into_iter().filter(|(n,)| n.starts_with(prefix)) {
        let columns = read_columns(pool, schema, &name).await?;
        let primary_key = read_primary_key(pool, schema, &name).await?;
        let unique_constraints = read_unique_constraints(pool, schema, &name).await?;
        let foreign_keys = read_foreign_keys(pool, schema, &name).await?;
        tracing::debug!(table = %name, columns = columns.len(), foreign_keys = foreign_keys.len(), "catalog read");
        tables.push(TableDescriptor {
            name,
            columns,
            primary_key,
            unique_constraints,
            foreign_keys,
        });
    }
    Ok(tables)
}

type ColumnRow = (
    String,
    String,
    Option<i32>,
    String,
    Option<String>,
    Option<i32>,
    Option<i32>,
    String,
);

async fn read_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, BackupError> {
    let rows: Vec<ColumnRow> = sqlx::query_as(
        "SELECT column_name::text, data_type::text, character_maximum_length::int4, \
                is_nullable::text, column_default::text, numeric_precision::int4, \
                numeric_scale::int4, is_identity::text \
         FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = $2 \
         ORDER BY ordinal_position",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(name, data_type, max_length, is_nullable, default, numeric_precision, numeric_scale, is_identity)| {
                ColumnDescriptor {
                    name,
                    data_type,
                    max_length,
                    nullable: is_nullable == "YES",
                    default,
                    numeric_precision,
                    numeric_scale,
                    is_identity: is_identity == "YES",
                }
            },
        )
        .collect())
}

async fn read_primary_key(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>, BackupError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT kcu.column_name::text \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name \
          AND tc.table_schema = kcu.table_schema \
          AND tc.table_name = kcu.table_name \
         WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
         ORDER BY kcu.ordinal_position",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(c,)| c).collect())
}

async fn read_unique_constraints(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<UniqueConstraint>, BackupError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT tc.constraint_name::text, kcu.column_name::text \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name \
          AND tc.table_schema = kcu.table_schema \
          AND tc.table_name = kcu.table_name \
         WHERE tc.constraint_type = 'UNIQUE' AND tc.table_schema = $1 AND tc.table_name = $2 \
         ORDER BY tc.constraint_name, kcu.ordinal_position",
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await?;
    Ok(group_unique_columns(rows))
}

/// Fold `(constraint, column)` rows, already sorted by constraint, into one entry per constraint.
fn group_unique_columns(rows: Vec<(String, String)>) -> Vec<UniqueConstraint> {
    let mut out: Vec<UniqueConstraint> = Vec::new();
    for (constraint_name, column) in rows {
        match out.last_mut() {
            Some(last) if last.constraint_name == constraint_name => last.columns.push(column),
            _ => out.push(UniqueConstraint {
                constraint_name,
                columns: vec![column],
            }),
        }
    }
    out
}

/// Foreign keys of one table, matched through `conrelid` since constraint names repeat across
/// tables. `conkey` and `confkey` are unnested together so composite keys stay position-matched.
const FOREIGN_KEY_QUERY: &str = "\
SELECT c.conname::text, a.attname::text, rt.relname::text, ra.attname::text, \
       CASE c.confdeltype \
           WHEN 'a' THEN 'NO ACTION' \
           WHEN 'r' THEN 'RESTRICT' \
           WHEN 'c' THEN 'CASCADE' \
           WHEN 'n' THEN 'SET NULL' \
           WHEN 'd' THEN 'SET DEFAULT' \
       END \
FROM pg_catalog.pg_constraint c \
JOIN pg_catalog.pg_class t ON t.oid = c.conrelid \
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid \
CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refattnum, ord) \
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum \
JOIN pg_catalog.pg_attribute ra ON ra.attrelid = c.confrelid AND ra.attnum = k.refattnum \
WHERE c.contype = 'f' AND n.nspname = $1 AND t.relname = $2 \
ORDER BY c.conname, k.ord";

async fn read_foreign_keys(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<ForeignKeyDescriptor>, BackupError> {
    let rows: Vec<(String, String, String, String, Option<String>)> = sqlx::query_as(FOREIGN_KEY_QUERY)
        .bind(schema)
        .bind(table)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(
            |(constraint_name, column, referenced_table, referenced_column, delete_rule)| ForeignKeyDescriptor {
                constraint_name,
                column,
                referenced_table,
                referenced_column,
                delete_rule,
            },
        )
        .collect())
}
