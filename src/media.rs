//! Uploaded ID pictures on the local media root.

use crate::config::{is_absolute_url, local_media_url, StorageBackend};
use crate::error::AppError;
use crate::state::AppState;
use std::path::Path;

pub const ID_PICTURE_DIR: &str = "id_pictures";
const MAX_STORED_NAME: usize = 100;

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Relative stored name `id_pictures/<uuid>_<name>`, bounded to fit the column.
pub fn stored_name(original: &str) -> String {
    let prefix = format!("{}/{}_", ID_PICTURE_DIR, uuid::Uuid::new_v4().simple());
    let name = sanitize_file_name(original);
    let room = MAX_STORED_NAME.saturating_sub(prefix.len());
    let keep = name.len().saturating_sub(room);
    // Trim from the front so the extension survives.
    format!("{}{}", prefix, &name[keep..])
}

/// Write the upload under `media_root` and return the relative name to record.
pub async fn save_id_picture(media_root: &Path, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("id_picture is empty".into()));
    }
    let stored = stored_name(original_name);
    let path = media_root.join(&stored);
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "id picture saved");
    Ok(stored)
}

/// Turns stored picture names into fetchable URLs. Uploads always land under `media_root`,
/// so a file found there is served locally even while object storage is active; other
/// relative names go through the storage backend.
pub struct PictureUrls<'a> {
    storage: &'a StorageBackend,
    media_root: &'a Path,
    media_url: &'a str,
}

impl<'a> PictureUrls<'a> {
    pub fn new(storage: &'a StorageBackend, media_root: &'a Path, media_url: &'a str) -> Self {
        PictureUrls {
            storage,
            media_root,
            media_url,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.storage, &state.settings.media_root, &state.settings.media_url)
    }

    /// `None` for a blank name.
    pub async fn resolve(&self, stored: &str) -> Option<String> {
        let stored = stored.trim();
        if stored.is_empty() {
            return None;
        }
        if is_absolute_url(stored) || !self.storage.is_object_storage() {
            return Some(self.storage.public_url(stored));
        }
        if saved_locally(self.media_root, stored).await {
            Some(local_media_url(self.media_url, stored))
        } else {
            Some(self.storage.public_url(stored))
        }
    }
}

async fn saved_locally(media_root: &Path, stored: &str) -> bool {
    let path = media_root.join(stored.trim_start_matches('/'));
    match tokio::fs::try_exists(&path).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not check local picture");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.jpg"), "pic.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn stored_name_is_prefixed_and_bounded() {
        let s = stored_name("photo.png");
        assert!(s.starts_with("id_pictures/"));
        assert!(s.ends_with("_photo.png"));
        let long = format!("{}.png", "a".repeat(300));
        let s = stored_name(&long);
        assert_eq!(s.len(), MAX_STORED_NAME);
        assert!(s.ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_is_written_under_media_root() {
        let root = std::env::temp_dir().join(format!("nups-media-{}", uuid::Uuid::new_v4()));
        let stored = save_id_picture(&root, "card.jpg", b"jpegbytes").await.unwrap();
        let written = tokio::fs::read(root.join(&stored)).await.unwrap();
        assert_eq!(written, b"jpegbytes");
        tokio::fs::remove_dir_all(&root).await.unwrap();
        assert!(save_id_picture(&root, "card.jpg", b"").await.is_err());
    }

    #[tokio::test]
    async fn local_uploads_keep_local_urls_under_object_storage() {
        let root = std::env::temp_dir().join(format!("nups-media-{}", uuid::Uuid::new_v4()));
        let stored = save_id_picture(&root, "card.jpg", b"jpegbytes").await.unwrap();
        let cdn = StorageBackend::ObjectStorage {
            account: "acct123".into(),
            cdn_host: "res.cloudinary.com".into(),
        };
        let urls = PictureUrls::new(&cdn, &root, "/media/");

        let local = urls.resolve(&stored).await;
        let remote = urls.resolve("id_pictures/uploaded_elsewhere.png").await;
        let absolute = urls.resolve("https://x.test/a.png").await;
        let blank = urls.resolve("  ").await;
        tokio::fs::remove_dir_all(&root).await.unwrap();

        assert_eq!(local, Some(format!("/media/{}", stored)));
        assert_eq!(
            remote.as_deref(),
            Some("https://res.cloudinary.com/acct123/image/upload/id_pictures/uploaded_elsewhere.png")
        );
        assert_eq!(absolute.as_deref(), Some("https://x.test/a.png"));
        assert_eq!(blank, None);
    }

    #[tokio::test]
    async fn local_backend_always_uses_media_url() {
        let local = StorageBackend::LocalFilesystem {
            media_url: "/uploads/".into(),
        };
        let root = std::env::temp_dir().join("nups-media-missing");
        let urls = PictureUrls::new(&local, &root, "/uploads/");
        assert_eq!(
            urls.resolve("id_pictures/a.png").await.as_deref(),
            Some("/uploads/id_pictures/a.png")
        );
    }
}
