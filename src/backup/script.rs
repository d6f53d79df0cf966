//! Assemble the backup text: header, transaction, schema, data, image summary.

use crate::backup::catalog::TableDescriptor;
use crate::backup::ddl::table_ddl;
use crate::backup::dml::{insert_statements, sequence_resets, RowValues, LITERAL_ESCAPE_MODE};
use crate::backup::quoted;
use crate::backup::rewrite::ImageStats;
use crate::config::StorageBackend;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Rows of one table, ready to emit.
pub struct TableData<'a> {
    pub table: &'a TableDescriptor,
    pub rows: Vec<RowValues>,
}

pub struct ScriptInput<'a> {
    pub database: &'a str,
    pub generated_at: DateTime<Utc>,
    pub storage: &'a StorageBackend,
    /// Parents first.
    pub tables: Vec<TableData<'a>>,
    pub image_stats: Option<ImageStats>,
}

/// `<name>_backup_<YYYYmmdd_HHMMSS>.sql`
pub fn backup_filename(name: &str, at: DateTime<Utc>) -> String {
    format!("{}_backup_{}.sql", name, at.format("%Y%m%d_%H%M%S"))
}

pub fn render_script(input: &ScriptInput<'_>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "-- {} database backup", input.database);
    let _ = writeln!(out, "-- Generated at: {}", input.generated_at.to_rfc3339());
    let _ = writeln!(out, "-- Database: {}", input.database);
    let _ = writeln!(out, "-- Image storage: {}", input.storage.describe());
    out.push('\n');
    out.push_str("BEGIN;\n\n");

    out.push_str("-- Schema\n\n");
    for data in &input.tables {
        out.push_str(&table_ddl(data.table));
        out.push('\n');
    }

    out.push_str("-- Data\n\n");
    out.push_str(LITERAL_ESCAPE_MODE);
    out.push_str("\n\n");
    for data in &input.tables {
        let inserts = insert_statements(data.table, &data.rows);
        if inserts.is_empty() {
            continue;
        }
        let _ = writeln!(out, "-- Data for {}", quoted(&data.table.name));
        for stmt in inserts.into_iter().chain(sequence_resets(data.table)) {
            out.push_str(&stmt);
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("COMMIT;\n");

    if input.storage.is_object_storage() {
        let stats = input.image_stats.clone().unwrap_or_default();
        out.push('\n');
        out.push_str(&summary_block(&stats));
    }
    out
}

fn summary_block(stats: &ImageStats) -> String {
    let mut out = String::new();
    out.push_str("-- Image summary\n");
    let _ = writeln!(out, "--   student rows: {}", stats.rows);
    let _ = writeln!(out, "--   with image: {}", stats.with_image);
    let _ = writeln!(out, "--   rewritten to CDN URLs: {}", stats.rewritten);
    let _ = writeln!(out, "--   already absolute: {}", stats.already_absolute);
    let _ = writeln!(out, "--   empty: {}", stats.empty);
    if !stats.samples.is_empty() {
        out.push_str("--   samples:\n");
        for url in &stats.samples {
            let _ = writeln!(out, "--     {}", url);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::catalog::{ColumnDescriptor, ForeignKeyDescriptor};
    use crate::backup::dml::SqlValue;
    use crate::backup::order::dependency_order;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn local() -> StorageBackend {
        StorageBackend::LocalFilesystem {
            media_url: "/media/".into(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn programs() -> TableDescriptor {
        let mut id = ColumnDescriptor::new("id", "bigint", false);
        id.default = Some("nextval('programs_id_seq'::regclass)".into());
        let mut name = ColumnDescriptor::new("name", "character varying", false);
        name.max_length = Some(200);
        TableDescriptor {
            name: "programs".into(),
            columns: vec![id, name],
            primary_key: vec!["id".into()],
            unique_constraints: vec![],
            foreign_keys: vec![],
        }
    }

    fn students() -> TableDescriptor {
        let mut id = ColumnDescriptor::new("id", "bigint", false);
        id.default = Some("nextval('students_id_seq'::regclass)".into());
        TableDescriptor {
            name: "students".into(),
            columns: vec![id, ColumnDescriptor::new("program_id", "bigint", true)],
            primary_key: vec!["id".into()],
            unique_constraints: vec![],
            foreign_keys: vec![ForeignKeyDescriptor {
                constraint_name: "students_program_id_fk".into(),
                column: "program_id".into(),
                referenced_table: "programs".into(),
                referenced_column: "id".into(),
                delete_rule: Some("SET NULL".into()),
            }],
        }
    }

    fn rows_for(table: &TableDescriptor) -> Vec<RowValues> {
        match table.name.as_str() {
            "programs" => vec![
                vec![SqlValue::Int(1), SqlValue::Text("Nursing".into())],
                vec![SqlValue::Int(2), SqlValue::Text("Midwifery".into())],
            ],
            _ => vec![vec![SqlValue::Int(1), SqlValue::Int(1)]],
        }
    }

    #[test]
    fn filename_uses_timestamp() {
        assert_eq!(backup_filename("nups", at()), "nups_backup_20240506_070809.sql");
    }

    #[test]
    fn parents_are_created_and_filled_before_children() {
        // Children listed first on purpose.
        let tables = vec![students(), programs()];
        let ordered = dependency_order(&tables).unwrap();
        let storage = local();
        let input = ScriptInput {
            database: "nups",
            generated_at: at(),
            storage: &storage,
            tables: ordered
                .into_iter()
                .map(|t| TableData {
                    table: t,
                    rows: rows_for(t),
                })
                .collect(),
            image_stats: None,
        };
        let script = render_script(&input);

        let pos = |needle: &str| script.find(needle).unwrap_or_else(|| panic!("missing {}", needle));
        assert!(pos("BEGIN;") < pos("CREATE TABLE \"programs\""));
        assert!(pos("CREATE TABLE \"programs\"") < pos("CREATE TABLE \"students\""));
        assert!(pos("CREATE TABLE \"students\"") < pos("INSERT INTO \"programs\""));
        assert!(pos("INSERT INTO \"programs\"") < pos("INSERT INTO \"students\""));
        assert!(pos("INSERT INTO \"students\"") < pos("COMMIT;"));
        assert_eq!(script.matches("INSERT INTO \"programs\"").count(), 2);
        assert_eq!(script.matches("INSERT INTO \"students\"").count(), 1);
        assert!(script.trim_end().ends_with("COMMIT;"));
        assert!(!script.contains("Image summary"));
    }

    #[test]
    fn empty_table_gets_ddl_but_no_data_block() {
        let table = programs();
        let storage = local();
        let input = ScriptInput {
            database: "nups",
            generated_at: at(),
            storage: &storage,
            tables: vec![TableData {
                table: &table,
                rows: vec![],
            }],
            image_stats: None,
        };
        let script = render_script(&input);
        assert!(script.contains("CREATE TABLE \"programs\""));
        assert!(!script.contains("INSERT INTO"));
        assert!(!script.contains("-- Data for"));
    }

    #[test]
    fn full_script_layout() {
        let table = programs();
        let storage = local();
        let input = ScriptInput {
            database: "nups",
            generated_at: at(),
            storage: &storage,
            tables: vec![TableData {
                table: &table,
                rows: vec![vec![SqlValue::Int(1), SqlValue::Text("O'Brien Studies".into())]],
            }],
            image_stats: None,
        };
        let expected = "-- nups database backup\n\
-- Generated at: 2024-05-06T07:08:09+00:00\n\
-- Database: nups\n\
-- Image storage: local filesystem (media url: /media/)\n\
\n\
BEGIN;\n\
\n\
-- Schema\n\
\n\
DROP TABLE IF EXISTS \"programs\" CASCADE;\n\
CREATE TABLE \"programs\" (\n    \
\"id\" BIGSERIAL PRIMARY KEY,\n    \
\"name\" VARCHAR(200) NOT NULL\n\
);\n\
\n\
-- Data\n\
\n\
SET LOCAL standard_conforming_strings = off;\n\
\n\
-- Data for \"programs\"\n\
INSERT INTO \"programs\" (\"id\", \"name\") VALUES (1, 'O''Brien Studies');\n\
SELECT setval(pg_get_serial_sequence('\"programs\"', 'id'), GREATEST(MAX(\"id\"), 1)) FROM \"programs\";\n\
\n\
COMMIT;\n";
        assert_eq!(render_script(&input), expected);
    }

    #[test]
    fn backslashes_are_read_in_escape_mode_and_sequences_follow_the_rows() {
        let table = programs();
        let storage = local();
        let input = ScriptInput {
            database: "nups",
            generated_at: at(),
            storage: &storage,
            tables: vec![TableData {
                table: &table,
                rows: vec![
                    vec![SqlValue::Int(1), SqlValue::Text("C:\\path".into())],
                    vec![SqlValue::Int(7), SqlValue::Text("Nursing".into())],
                ],
            }],
            image_stats: None,
        };
        let script = render_script(&input);
        let pos = |needle: &str| script.find(needle).unwrap_or_else(|| panic!("missing {}", needle));
        assert!(pos("BEGIN;") < pos("SET LOCAL standard_conforming_strings = off;"));
        assert!(pos("SET LOCAL standard_conforming_strings = off;") < pos("VALUES (1, 'C:\\\\path')"));
        assert!(pos("VALUES (7, 'Nursing')") < pos("SELECT setval("));
        assert!(pos("SELECT setval(") < pos("COMMIT;"));
        assert_eq!(script.matches("SELECT setval(").count(), 1);
    }

    #[test]
    fn object_storage_appends_image_summary() {
        let table = programs();
        let storage = StorageBackend::ObjectStorage {
            account: "acct123".into(),
            cdn_host: "res.cloudinary.com".into(),
        };
        let stats = ImageStats {
            rows: 4,
            with_image: 3,
            rewritten: 2,
            already_absolute: 1,
            empty: 1,
            samples: vec!["https://res.cloudinary.com/acct123/image/upload/id_pictures/a.png".into()],
        };
        let input = ScriptInput {
            database: "nups",
            generated_at: at(),
            storage: &storage,
            tables: vec![TableData {
                table: &table,
                rows: vec![],
            }],
            image_stats: Some(stats),
        };
        let script = render_script(&input);
        let summary = &script[script.find("COMMIT;").unwrap()..];
        assert!(summary.contains("-- Image summary\n"));
        assert!(summary.contains("--   student rows: 4\n"));
        assert!(summary.contains("--   rewritten to CDN URLs: 2\n"));
        assert!(summary.contains("--   already absolute: 1\n"));
        assert!(summary.contains("--     https://res.cloudinary.com/acct123/image/upload/id_pictures/a.png\n"));
        assert!(script.contains("-- Image storage: object storage (account: acct123, host: res.cloudinary.com)"));
    }
}
