use anyhow::Result;
use sqlx::PgPool;

/// Applies the embedded migrations under `backend/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Relationship schema is up to date");
    Ok(())
}
