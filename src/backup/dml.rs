//! Row values and INSERT statements.

use crate::backup::catalog::{ColumnDescriptor, TableDescriptor};
use crate::backup::ddl::serial_type;
use crate::backup::quoted;
use crate::error::BackupError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// How a column is read back. Anything without a native decoder is selected as text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Bool,
    Date,
    Timestamp,
    TimestampTz,
    Text,
}

impl ColumnKind {
    pub fn of(column: &ColumnDescriptor) -> Self {
        match column.data_type.as_str() {
            "smallint" => ColumnKind::Int2,
            "integer" => ColumnKind::Int4,
            "bigint" => ColumnKind::Int8,
            "real" => ColumnKind::Float4,
            "double precision" => ColumnKind::Float8,
            "numeric" => ColumnKind::Numeric,
            "boolean" => ColumnKind::Bool,
            "date" => ColumnKind::Date,
            "timestamp without time zone" => ColumnKind::Timestamp,
            "timestamp with time zone" => ColumnKind::TimestampTz,
            _ => ColumnKind::Text,
        }
    }

    /// Numerics and text-decoded types are cast in the SELECT so they arrive as strings.
    fn select_expr(self, column: &str) -> String {
        match self {
            ColumnKind::Numeric | ColumnKind::Text => format!("{}::text", quoted(column)),
            _ => quoted(column),
        }
    }
}

/// One cell of a backed-up row.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal kept as its textual form.
    Numeric(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl SqlValue {
    /// SQL literal for this value.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(s) => quote_literal(s),
            SqlValue::Bool(true) => "TRUE".to_string(),
            SqlValue::Bool(false) => "FALSE".to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) if f.is_finite() => f.to_string(),
            SqlValue::Float(f) => quote_literal(&f.to_string()),
            SqlValue::Numeric(s) => s.clone(),
            SqlValue::Date(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(t) => quote_literal(&t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::TimestampTz(t) => quote_literal(&t.to_rfc3339()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Escape mode the literals below are written for. With `standard_conforming_strings` on
/// (the server default) a doubled backslash would be restored as two characters.
pub const LITERAL_ESCAPE_MODE: &str = "SET LOCAL standard_conforming_strings = off;";

/// Single-quoted literal: backslashes doubled first, then single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Cells in catalog column order.
pub type RowValues = Vec<SqlValue>;

/// All rows of a table, cells in catalog column order, ordered by `id` (or the first key column).
pub async fn fetch_rows(pool: &PgPool, schema: &str, table: &TableDescriptor) -> Result<Vec<RowValues>, BackupError> {
    if table.columns.is_empty() {
        return Ok(Vec::new());
    }
    let kinds: Vec<ColumnKind> = table.columns.iter().map(ColumnKind::of).collect();
    let select_list: Vec<String> = table
        .columns
        .iter()
        .zip(&kinds)
        .map(|(c, k)| k.select_expr(&c.name))
        .collect();
    let order_clause = table
        .order_column()
        .map(|c| format!(" ORDER BY {} ASC", quoted(c)))
        .unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM {}.{}{}",
        select_list.join(", "),
        quoted(schema),
        quoted(&table.name),
        order_clause
    );
    tracing::debug!(sql = %sql, "backup rows");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        out.push(decode_row(row, &kinds)?);
    }
    Ok(out)
}

fn decode_row(row: &PgRow, kinds: &[ColumnKind]) -> Result<RowValues, sqlx::Error> {
    kinds.iter().enumerate().map(|(i, kind)| decode_cell(row, i, *kind)).collect()
}

fn decode_cell(row: &PgRow, i: usize, kind: ColumnKind) -> Result<SqlValue, sqlx::Error> {
    let value = match kind {
        ColumnKind::Int2 => row.try_get::<Option<i16>, _>(i)?.map(|n| SqlValue::Int(n.into())),
        ColumnKind::Int4 => row.try_get::<Option<i32>, _>(i)?.map(|n| SqlValue::Int(n.into())),
        ColumnKind::Int8 => row.try_get::<Option<i64>, _>(i)?.map(SqlValue::Int),
        ColumnKind::Float4 => row.try_get::<Option<f32>, _>(i)?.map(|f| SqlValue::Float(f.into())),
        ColumnKind::Float8 => row.try_get::<Option<f64>, _>(i)?.map(SqlValue::Float),
        ColumnKind::Numeric => row.try_get::<Option<String>, _>(i)?.map(SqlValue::Numeric),
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(i)?.map(SqlValue::Bool),
        ColumnKind::Date => row.try_get::<Option<NaiveDate>, _>(i)?.map(SqlValue::Date),
        ColumnKind::Timestamp => row.try_get::<Option<NaiveDateTime>, _>(i)?.map(SqlValue::Timestamp),
        ColumnKind::TimestampTz => row.try_get::<Option<DateTime<Utc>>, _>(i)?.map(SqlValue::TimestampTz),
        ColumnKind::Text => row.try_get::<Option<String>, _>(i)?.map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

/// One `INSERT INTO` per row. Empty tables yield nothing.
pub fn insert_statements(table: &TableDescriptor, rows: &[RowValues]) -> Vec<String> {
    let columns: Vec<String> = table.columns.iter().map(|c| quoted(&c.name)).collect();
    let columns = columns.join(", ");
    let name = quoted(&table.name);
    rows.iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(SqlValue::to_literal).collect();
            format!("INSERT INTO {} ({}) VALUES ({});", name, columns, values.join(", "))
        })
        .collect()
}

/// Move each serial column's sequence past the restored rows so the next insert does not
/// collide with an explicit id.
pub fn sequence_resets(table: &TableDescriptor) -> Vec<String> {
    let name = quoted(&table.name);
    table
        .columns
        .iter()
        .filter(|c| serial_type(c).is_some())
        .map(|c| {
            format!(
                "SELECT setval(pg_get_serial_sequence({}, {}), GREATEST(MAX({}), 1)) FROM {};",
                quote_literal(&name),
                quote_literal(&c.name),
                quoted(&c.name),
                name
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(SqlValue::Text("O'Brien".into()).to_literal(), "'O''Brien'");
        assert_eq!(SqlValue::Text("C:\\path".into()).to_literal(), "'C:\\\\path'");
        assert_eq!(SqlValue::Text("a\\'b".into()).to_literal(), "'a\\\\''b'");
    }

    #[test]
    fn scalar_literals() {
        assert_eq!(SqlValue::Null.to_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_literal(), "TRUE");
        assert_eq!(SqlValue::Bool(false).to_literal(), "FALSE");
        assert_eq!(SqlValue::Int(-42).to_literal(), "-42");
        assert_eq!(SqlValue::Numeric("12.50".into()).to_literal(), "12.50");
        assert_eq!(SqlValue::Float(1.5).to_literal(), "1.5");
        assert_eq!(SqlValue::Float(f64::NAN).to_literal(), "'NaN'");
    }

    #[test]
    fn dates_are_quoted_iso_8601() {
        let d = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();
        assert_eq!(SqlValue::Date(d).to_literal(), "'2001-02-03'");
        let t = d.and_hms_opt(4, 5, 6).unwrap();
        assert_eq!(SqlValue::Timestamp(t).to_literal(), "'2001-02-03T04:05:06'");
        assert_eq!(
            SqlValue::TimestampTz(t.and_utc()).to_literal(),
            "'2001-02-03T04:05:06+00:00'"
        );
    }

    #[test]
    fn column_kind_falls_back_to_text() {
        assert_eq!(ColumnKind::of(&ColumnDescriptor::new("x", "jsonb", true)), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&ColumnDescriptor::new("x", "bigint", true)), ColumnKind::Int8);
        assert_eq!(ColumnKind::Numeric.select_expr("amount"), "\"amount\"::text");
        assert_eq!(ColumnKind::Int4.select_expr("id"), "\"id\"");
    }

    #[test]
    fn one_insert_per_row_in_column_order() {
        let table = TableDescriptor {
            name: "core_program".into(),
            columns: vec![
                ColumnDescriptor::new("id", "bigint", false),
                ColumnDescriptor::new("name", "character varying", false),
            ],
            primary_key: vec!["id".into()],
            unique_constraints: vec![],
            foreign_keys: vec![],
        };
        let rows = vec![
            vec![SqlValue::Int(1), SqlValue::Text("Nursing".into())],
            vec![SqlValue::Int(2), SqlValue::Text("Midwifery".into())],
        ];
        assert_eq!(
            insert_statements(&table, &rows),
            vec![
                "INSERT INTO \"core_program\" (\"id\", \"name\") VALUES (1, 'Nursing');",
                "INSERT INTO \"core_program\" (\"id\", \"name\") VALUES (2, 'Midwifery');",
            ]
        );
        assert!(insert_statements(&table, &[]).is_empty());
    }

    #[test]
    fn serial_columns_get_a_sequence_reset() {
        let mut id = ColumnDescriptor::new("id", "bigint", false);
        id.default = Some("nextval('core_program_id_seq'::regclass)".into());
        let mut plain = TableDescriptor {
            name: "core_program".into(),
            columns: vec![id, ColumnDescriptor::new("name", "text", false)],
            primary_key: vec!["id".into()],
            unique_constraints: vec![],
            foreign_keys: vec![],
        };
        assert_eq!(
            sequence_resets(&plain),
            vec![
                "SELECT setval(pg_get_serial_sequence('\"core_program\"', 'id'), GREATEST(MAX(\"id\"), 1)) FROM \"core_program\";"
            ]
        );
        plain.columns[0].default = None;
        assert!(sequence_resets(&plain).is_empty());
    }
}
