//! DROP/CREATE statements from table descriptors.

use crate::backup::catalog::{ColumnDescriptor, TableDescriptor};
use crate::backup::quoted;

/// DDL spelling for a catalog type. Unknown types pass through upper-cased.
pub fn map_column_type(column: &ColumnDescriptor) -> String {
    match column.data_type.as_str() {
        "character varying" => match column.max_length {
            Some(n) => format!("VARCHAR({})", n),
            None => "VARCHAR".to_string(),
        },
        "character" => match column.max_length {
            Some(n) => format!("CHAR({})", n),
            None => "CHAR".to_string(),
        },
        "numeric" => match (column.numeric_precision, column.numeric_scale) {
            (Some(p), Some(s)) => format!("NUMERIC({}, {})", p, s),
            (Some(p), None) => format!("NUMERIC({})", p),
            _ => "NUMERIC".to_string(),
        },
        "smallint" => "SMALLINT".to_string(),
        "integer" => "INTEGER".to_string(),
        "bigint" => "BIGINT".to_string(),
        "real" => "REAL".to_string(),
        "double precision" => "DOUBLE PRECISION".to_string(),
        "boolean" => "BOOLEAN".to_string(),
        "date" => "DATE".to_string(),
        "timestamp with time zone" => "TIMESTAMP WITH TIME ZONE".to_string(),
        "timestamp without time zone" => "TIMESTAMP".to_string(),
        "text" => "TEXT".to_string(),
        other => other.to_uppercase(),
    }
}

/// Serial spelling for auto-increment integer columns; `None` for anything else.
pub(crate) fn serial_type(column: &ColumnDescriptor) -> Option<&'static str> {
    if !column.is_auto_increment() {
        return None;
    }
    match column.data_type.as_str() {
        "smallint" => Some("SMALLSERIAL"),
        "integer" => Some("SERIAL"),
        "bigint" => Some("BIGSERIAL"),
        _ => None,
    }
}

/// Default expression without its `::type` cast suffix.
pub fn strip_cast(expr: &str) -> &str {
    match expr.find("::") {
        Some(i) => expr[..i].trim_end(),
        None => expr.trim(),
    }
}

fn column_definition(table: &TableDescriptor, column: &ColumnDescriptor) -> String {
    let inline_pk = table.primary_key.len() == 1 && table.is_primary_key(&column.name);
    let mut def = quoted(&column.name);
    def.push(' ');
    match serial_type(column) {
        Some(serial) if inline_pk => {
            def.push_str(serial);
            def.push_str(" PRIMARY KEY");
            return def;
        }
        Some(serial) => {
            def.push_str(serial);
            if !column.nullable && !table.is_primary_key(&column.name) {
                def.push_str(" NOT NULL");
            }
            return def;
        }
        None => def.push_str(&map_column_type(column)),
    }
    if inline_pk {
        def.push_str(" PRIMARY KEY");
    } else if !column.nullable && !table.is_primary_key(&column.name) {
        def.push_str(" NOT NULL");
    }
    if let Some(expr) = column.default.as_deref() {
        let expr = strip_cast(expr);
        if !expr.is_empty() {
            def.push_str(" DEFAULT ");
            def.push_str(expr);
        }
    }
    def
}

/// `DROP TABLE IF EXISTS ... CASCADE;` followed by the `CREATE TABLE` statement.
pub fn table_ddl(table: &TableDescriptor) -> String {
    let name = quoted(&table.name);
    let mut parts: Vec<String> = table.columns.iter().map(|c| column_definition(table, c)).collect();
    if table.primary_key.len() > 1 {
        let cols: Vec<String> = table.primary_key.iter().map(|c| quoted(c)).collect();
        parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }
    for unique in &table.unique_constraints {
        let cols: Vec<String> = unique.columns.iter().map(|c| quoted(c)).collect();
        parts.push(format!("CONSTRAINT {} UNIQUE ({})", quoted(&unique.constraint_name), cols.join(", ")));
    }
    for fk in &table.foreign_keys {
        parts.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quoted(&fk.constraint_name),
            quoted(&fk.column),
            quoted(&fk.referenced_table),
            quoted(&fk.referenced_column),
            fk.delete_rule.as_deref().unwrap_or("NO ACTION")
        ));
    }
    format!(
        "DROP TABLE IF EXISTS {} CASCADE;\nCREATE TABLE {} (\n    {}\n);\n",
        name,
        name,
        parts.join(",\n    ")
    )
}
