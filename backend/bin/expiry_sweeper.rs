use expiring_friends::{
    constants::SWEEP_HEARTBEAT_EVERY_N_ITERS,
    db::{get_db_pool, DatabaseConfig, PgStore},
    utils::{init_logging, config::Config},
    RelationshipService,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting expiry sweeper...");

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    let service = RelationshipService::with_system_clock(Arc::new(PgStore::new(pool)));

    tokio::select! {
        _ = run_expiry_sweeper(&service, config.sweep_interval_secs) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping expiry sweeper");
        }
    }

    Ok(())
}

/// Periodically removes every expired friendship. Collaborators still sweep
/// lazily on their own read paths; this only keeps the table from carrying
/// stale rows for users who never come back.
async fn run_expiry_sweeper(service: &RelationshipService<PgStore>, interval_secs: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_secs));
    let mut iter_count: usize = 0;

    loop {
        interval.tick().await;
        iter_count += 1;

        match service.remove_all_expired_friends().await {
            Ok(report) if !report.removed.is_empty() => {
                for friendship in &report.removed {
                    info!(
                        "Expired friendship {} <-> {} (created {}, {} ms)",
                        friendship.user1, friendship.user2, friendship.created_on, friendship.duration_ms
                    );
                }
                info!("Sweep {} removed {} expired friendships", iter_count, report.removed.len());
            }
            Ok(_) => {
                if iter_count % SWEEP_HEARTBEAT_EVERY_N_ITERS == 0 {
                    info!("Sweep {}: no expired friendships", iter_count);
                }
            }
            Err(e) => {
                error!("Failed to sweep expired friendships: {}", e);
            }
        }
    }
}
