//! Schema-driven SQL backup: read the catalog, order tables by foreign keys, dump
//! DDL and rows, and wrap everything in one replayable transaction.

pub mod catalog;
pub mod ddl;
pub mod dml;
pub mod order;
pub mod rewrite;
pub mod script;

use crate::config::{Settings, StorageBackend};
use crate::error::BackupError;
use catalog::TableDescriptor;
use chrono::Utc;
use dml::RowValues;
use rewrite::{ImageRewriter, ImageStats};
use script::{ScriptInput, TableData};
use sqlx::PgPool;

/// Double-quoted identifier with embedded quotes doubled.
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// A finished backup ready to be sent as an attachment.
#[derive(Clone, Debug)]
pub struct BackupScript {
    pub filename: String,
    pub content: String,
}

/// Which tables to dump and how to name the result.
#[derive(Clone, Debug)]
pub struct BackupOptions {
    pub schema: String,
    pub table_prefix: String,
    pub name: String,
}

impl BackupOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        BackupOptions {
            schema: settings.db_schema.clone(),
            table_prefix: settings.table_prefix.clone(),
            name: settings.backup_name.clone(),
        }
    }
}

/// Rewrite image paths when `table` is the profile table. A failed rewrite keeps the stored
/// values and reports no stats; the backup still goes out.
pub fn apply_image_rewrite(
    rewriter: Option<&ImageRewriter<'_>>,
    table: &TableDescriptor,
    rows: Vec<RowValues>,
) -> (Vec<RowValues>, Option<ImageStats>) {
    let Some(rw) = rewriter.filter(|rw| rw.applies_to(table)) else {
        return (rows, None);
    };
    match rw.rewrite(table, &rows) {
        Ok((rewritten, stats)) => (rewritten, Some(stats)),
        Err(e) => {
            tracing::warn!(table = %table.name, error = %e, "image paths left as stored");
            (rows, None)
        }
    }
}

pub async fn generate_backup(
    pool: &PgPool,
    options: &BackupOptions,
    storage: &StorageBackend,
) -> Result<BackupScript, BackupError> {
    let generated_at = Utc::now();
    let tables = catalog::read_catalog(pool, &options.schema, &options.table_prefix).await?;
    let ordered = order::dependency_order(&tables)?;
    tracing::info!(
        schema = %options.schema,
        prefix = %options.table_prefix,
        tables = ordered.len(),
        "generating backup"
    );

    let rewriter = ImageRewriter::new(storage, &options.table_prefix);
    let mut image_stats: Option<ImageStats> = None;
    let mut data = Vec::with_capacity(ordered.len());
    for table in ordered {
        let rows = dml::fetch_rows(pool, &options.schema, table).await?;
        let (rows, stats) = apply_image_rewrite(rewriter.as_ref(), table, rows);
        if stats.is_some() {
            image_stats = stats;
        }
        data.push(TableData { table, rows });
    }

    let content = script::render_script(&ScriptInput {
        database: &options.name,
        generated_at,
        storage,
        tables: data,
        image_stats,
    });
    let filename = script::backup_filename(&options.name, generated_at);
    tracing::info!(filename = %filename, bytes = content.len(), "backup generated");
    Ok(BackupScript { filename, content })
}
