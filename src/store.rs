//! Database bootstrap helpers run before the main pool is built.

use crate::error::{AppError, ConfigError};
use sqlx::ConnectOptions;
use std::str::FromStr;

/// Create the database named in `database_url` when it does not exist yet. Connects to the
/// `postgres` maintenance database on the same server to do so.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Invalid {
        var: "DATABASE_URL",
        reason: e.to_string(),
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split a connection URL into (URL of the `postgres` database, target database name).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or(ConfigError::Invalid {
            var: "DATABASE_URL",
            reason: "no database path".into(),
        })?;
    let (base, path_and_query) = url.split_at(path_start);
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let admin_url = match parts.next() {
        Some(query) => format!("{}postgres?{}", base, query),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
