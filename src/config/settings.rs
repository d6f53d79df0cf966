//! Process settings read from the environment (optionally seeded from `.env`).

use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/nups";
pub const DEFAULT_CDN_HOST: &str = "res.cloudinary.com";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    /// Shared HS256 secret of the token provider.
    pub secret_key: String,
    /// Catalog schema the backup reads (`public` for a default install).
    pub db_schema: String,
    /// Prefix marking application-owned tables.
    pub table_prefix: String,
    /// Stem of generated backup file names.
    pub backup_name: String,
    pub use_cloudinary: bool,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_cdn_host: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Settings {
    /// Load `.env` if present, then read settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let use_cloudinary = match get("USE_CLOUDINARY") {
            Some(v) => parse_bool("USE_CLOUDINARY", &v)?,
            None => false,
        };
        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: "MAX_UPLOAD_BYTES",
                reason: e.to_string(),
            })?,
            None => 10 * 1024 * 1024,
        };
        let cors_allowed_origins = match get("CORS_ALLOWED_ORIGINS").as_deref() {
            None | Some("*") => None,
            Some(list) => Some(
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        };
        let mut media_url = get("MEDIA_URL").unwrap_or_else(|| "/media/".into());
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            secret_key,
            db_schema: get("DB_SCHEMA").unwrap_or_else(|| "public".into()),
            table_prefix: get("TABLE_PREFIX").unwrap_or_else(|| "core_".into()),
            backup_name: get("BACKUP_NAME").unwrap_or_else(|| "nups".into()),
            use_cloudinary,
            cloudinary_cloud_name: get("CLOUDINARY_CLOUD_NAME"),
            cloudinary_cdn_host: get("CLOUDINARY_CDN_HOST").unwrap_or_else(|| DEFAULT_CDN_HOST.into()),
            media_root: PathBuf::from(get("MEDIA_ROOT").unwrap_or_else(|| "media".into())),
            media_url,
            max_upload_bytes,
            cors_allowed_origins,
        })
    }
}

fn parse_bool(var: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}
