//! Rewrite stored ID-picture paths into CDN URLs when object storage is active.

use crate::backup::catalog::TableDescriptor;
use crate::backup::dml::{RowValues, SqlValue};
use crate::config::{is_absolute_url, StorageBackend};
use crate::error::BackupError;

pub const IMAGE_COLUMN: &str = "id_picture";
const SAMPLE_LIMIT: usize = 3;

/// Counts gathered while rewriting, reported in the backup summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub rows: usize,
    pub with_image: usize,
    pub rewritten: usize,
    pub already_absolute: usize,
    pub empty: usize,
    pub samples: Vec<String>,
}

pub struct ImageRewriter<'a> {
    storage: &'a StorageBackend,
    /// Full name of the student profile table, e.g. `core_studentprofile`.
    table: String,
}

impl<'a> ImageRewriter<'a> {
    /// `None` unless object storage is active.
    pub fn new(storage: &'a StorageBackend, table_prefix: &str) -> Option<Self> {
        storage.is_object_storage().then(|| ImageRewriter {
            storage,
            table: format!("{}studentprofile", table_prefix),
        })
    }

    pub fn applies_to(&self, table: &TableDescriptor) -> bool {
        table.name == self.table
    }

    /// Rewritten copy of `rows`. Only the image column changes; positions stay put.
    pub fn rewrite(&self, table: &TableDescriptor, rows: &[RowValues]) -> Result<(Vec<RowValues>, ImageStats), BackupError> {
        let idx = table.column_index(IMAGE_COLUMN).ok_or_else(|| BackupError::Rewrite {
            table: table.name.clone(),
            reason: format!("column {} not found", IMAGE_COLUMN),
        })?;
        let mut stats = ImageStats {
            rows: rows.len(),
            ..ImageStats::default()
        };
        let mut out = Vec::with_capacity(rows.len());
        for (n, row) in rows.iter().enumerate() {
            let mut row = row.clone();
            let cell = row.get_mut(idx).ok_or_else(|| BackupError::Rewrite {
                table: table.name.clone(),
                reason: format!("row {} has {} cells, expected more than {}", n, rows[n].len(), idx),
            })?;
            match cell {
                SqlValue::Null => stats.empty += 1,
                SqlValue::Text(path) if path.trim().is_empty() => stats.empty += 1,
                SqlValue::Text(path) if is_absolute_url(path) => {
                    stats.with_image += 1;
                    stats.already_absolute += 1;
                }
                SqlValue::Text(path) => {
                    let url = self.storage.object_url(path).ok_or_else(|| BackupError::Rewrite {
                        table: table.name.clone(),
                        reason: "storage backend cannot build object URLs".into(),
                    })?;
                    stats.with_image += 1;
                    stats.rewritten += 1;
                    if stats.samples.len() < SAMPLE_LIMIT {
                        stats.samples.push(url.clone());
                    }
                    *path = url;
                }
                other => {
                    return Err(BackupError::Rewrite {
                        table: table.name.clone(),
                        reason: format!("unexpected value {:?} in {}", other, IMAGE_COLUMN),
                    })
                }
            }
            out.push(row);
        }
        Ok((out, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::catalog::ColumnDescriptor;

    fn storage() -> StorageBackend {
        StorageBackend::ObjectStorage {
            account: "acct123".into(),
            cdn_host: "res.cloudinary.com".into(),
        }
    }

    fn profile_table(with_image: bool) -> TableDescriptor {
        let mut columns = vec![
            ColumnDescriptor::new("id", "bigint", false),
            ColumnDescriptor::new("first_name", "character varying", false),
        ];
        if with_image {
            columns.push(ColumnDescriptor::new("id_picture", "character varying", true));
        }
        TableDescriptor {
            name: "core_studentprofile".into(),
            columns,
            primary_key: vec!["id".into()],
            unique_constraints: vec![],
            foreign_keys: vec![],
        }
    }

    fn row(id: i64, picture: SqlValue) -> RowValues {
        vec![SqlValue::Int(id), SqlValue::Text("Ama".into()), picture]
    }

    #[test]
    fn only_active_for_object_storage() {
        let local = StorageBackend::LocalFilesystem { media_url: "/media/".into() };
        assert!(ImageRewriter::new(&local, "core_").is_none());
        let s = storage();
        let rw = ImageRewriter::new(&s, "core_").unwrap();
        assert!(rw.applies_to(&profile_table(true)));
    }

    #[test]
    fn relative_paths_become_cdn_urls_and_absolute_urls_stay() {
        let s = storage();
        let rw = ImageRewriter::new(&s, "core_").unwrap();
        let rows = vec![
            row(1, SqlValue::Text("id_pictures/photo.png".into())),
            row(2, SqlValue::Text("https://cdn.test/x.png".into())),
            row(3, SqlValue::Null),
            row(4, SqlValue::Text("/media/id_pictures/p_ab12".into())),
            row(5, SqlValue::Text(String::new())),
        ];
        let (out, stats) = rw.rewrite(&profile_table(true), &rows).unwrap();
        assert_eq!(
            out[0][2],
            SqlValue::Text("https://res.cloudinary.com/acct123/image/upload/id_pictures/photo.png".into())
        );
        assert_eq!(out[1][2], SqlValue::Text("https://cdn.test/x.png".into()));
        assert_eq!(out[2][2], SqlValue::Null);
        assert_eq!(
            out[3][2],
            SqlValue::Text("https://res.cloudinary.com/acct123/image/upload/id_pictures/p_ab12".into())
        );
        assert_eq!(out[4][2], SqlValue::Text(String::new()));
        assert_eq!(out[0][..2], rows[0][..2]);
        assert_eq!(stats.rows, 5);
        assert_eq!(stats.with_image, 3);
        assert_eq!(stats.rewritten, 2);
        assert_eq!(stats.already_absolute, 1);
        assert_eq!(stats.empty, 2);
        assert_eq!(stats.samples.len(), 2);
    }

    #[test]
    fn missing_column_is_a_rewrite_error() {
        let s = storage();
        let rw = ImageRewriter::new(&s, "core_").unwrap();
        let rows = vec![vec![SqlValue::Int(1), SqlValue::Text("Ama".into())]];
        assert!(matches!(
            rw.rewrite(&profile_table(false), &rows),
            Err(BackupError::Rewrite { .. })
        ));
    }
}
