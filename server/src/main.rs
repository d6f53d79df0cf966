//! NUPS API server.
//!
//! Run from repo root: `cargo run -p nups-server`

use axum::{extract::Request, ServiceExt};
use nups_api::{app, apply_migrations, ensure_database_exists, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nups_api=info,nups_server=info")),
        )
        .init();

    let settings = Settings::load()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    apply_migrations(&pool).await?;
    tokio::fs::create_dir_all(&settings.media_root).await?;

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(pool, settings);
    let app = app(state);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("NUPS API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}
