//! Where uploaded images live: an object-storage CDN or the local media directory.
//! Resolved once at startup and handed to everything that builds image URLs.

use crate::config::Settings;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Images served from `https://<cdn_host>/<account>/image/upload/<path>`.
    ObjectStorage { account: String, cdn_host: String },
    /// Images served by the application under `media_url`.
    LocalFilesystem { media_url: String },
}

impl StorageBackend {
    /// Pick the backend from settings and log the outcome. Object storage without an
    /// account name degrades to the local filesystem.
    pub fn resolve(settings: &Settings) -> Self {
        let backend = match (settings.use_cloudinary, &settings.cloudinary_cloud_name) {
            (true, Some(account)) => StorageBackend::ObjectStorage {
                account: account.clone(),
                cdn_host: settings.cloudinary_cdn_host.clone(),
            },
            (true, None) => {
                tracing::warn!("USE_CLOUDINARY is set but CLOUDINARY_CLOUD_NAME is empty; using local media storage");
                StorageBackend::LocalFilesystem {
                    media_url: settings.media_url.clone(),
                }
            }
            (false, _) => StorageBackend::LocalFilesystem {
                media_url: settings.media_url.clone(),
            },
        };
        match &backend {
            StorageBackend::ObjectStorage { account, cdn_host } => {
                tracing::info!(backend = "object_storage", account = %account, cdn_host = %cdn_host, "storage backend resolved")
            }
            StorageBackend::LocalFilesystem { media_url } => {
                tracing::info!(backend = "local_filesystem", media_url = %media_url, "storage backend resolved")
            }
        }
        backend
    }

    pub fn is_object_storage(&self) -> bool {
        matches!(self, StorageBackend::ObjectStorage { .. })
    }

    /// One-line description used in backup headers.
    pub fn describe(&self) -> String {
        match self {
            StorageBackend::ObjectStorage { account, cdn_host } => {
                format!("object storage (account: {}, host: {})", account, cdn_host)
            }
            StorageBackend::LocalFilesystem { media_url } => {
                format!("local filesystem (media url: {})", media_url)
            }
        }
    }

    /// Absolute CDN URL for a stored image name. `None` when this backend is local.
    pub fn object_url(&self, stored: &str) -> Option<String> {
        match self {
            StorageBackend::ObjectStorage { account, cdn_host } => Some(format!(
                "https://{}/{}/image/upload/{}",
                cdn_host,
                account,
                normalize_stored_path(stored)
            )),
            StorageBackend::LocalFilesystem { .. } => None,
        }
    }

    /// URL a client can fetch the image from.
    pub fn public_url(&self, stored: &str) -> String {
        if is_absolute_url(stored) {
            return stored.to_string();
        }
        match self {
            StorageBackend::ObjectStorage { .. } => self.object_url(stored).unwrap_or_default(),
            StorageBackend::LocalFilesystem { media_url } => local_media_url(media_url, stored),
        }
    }
}

/// URL of a file served from the local media root.
pub fn local_media_url(media_url: &str, stored: &str) -> String {
    format!("{}{}", media_url, stored.trim_start_matches('/'))
}

pub fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Strip the leading slash and a local `media/` prefix; everything after is kept verbatim.
pub fn normalize_stored_path(stored: &str) -> &str {
    let path = stored.trim_start_matches('/');
    path.strip_prefix(LOCAL_MEDIA_PREFIX).unwrap_or(path)
}

const LOCAL_MEDIA_PREFIX: &str = "media/";
