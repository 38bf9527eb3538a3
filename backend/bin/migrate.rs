use expiring_friends::{utils, get_db_pool};
use expiring_friends::db::DatabaseConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    info!("Running relationship schema migrations...");
    expiring_friends::db::migrations::run_migrations(&pool).await?;
    info!("Migrations completed successfully!");

    Ok(())
}
