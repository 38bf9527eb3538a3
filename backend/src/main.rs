use clap::{Parser, Subcommand};
use expiring_friends::{
    constants::DEFAULT_FRIENDSHIP_DURATION_MS,
    db::{get_db_pool, migrations, DatabaseConfig, PgStore},
    utils, RelationshipError, RelationshipService, UserId,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Administer expiring friendships from the command line.
#[derive(Debug, Parser)]
#[command(name = "friendctl", version, about)]
struct Cli {
    /// Apply pending migrations before running the command
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a friend request
    Send {
        from: UserId,
        to: UserId,
        /// Lifetime of the resulting friendship in milliseconds
        #[arg(long, default_value_t = DEFAULT_FRIENDSHIP_DURATION_MS, allow_negative_numbers = true)]
        duration_ms: i64,
    },
    /// Accept the pending request between two users
    Accept { from: UserId, to: UserId },
    /// Reject the pending request between two users
    Reject { from: UserId, to: UserId },
    /// Withdraw the pending request between two users
    Withdraw { from: UserId, to: UserId },
    /// End a friendship
    Unfriend { user: UserId, friend: UserId },
    /// List a user's current friends (sweeps their expired friendships first)
    Friends {
        user: UserId,
        /// Print full friendship records instead of identifiers
        #[arg(long)]
        detailed: bool,
    },
    /// List every request record involving a user
    Requests { user: UserId },
    /// Check whether two users are friends
    IsFriend { user1: UserId, user2: UserId },
    /// Remove expired friendships of one user, or of everyone with --all
    Sweep {
        #[arg(required_unless_present = "all")]
        user: Option<UserId>,
        #[arg(long, conflicts_with = "user")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();
    let cli = Cli::parse();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    if cli.migrate {
        migrations::run_migrations(&pool).await?;
    }

    let service = RelationshipService::with_system_clock(Arc::new(PgStore::new(pool)));

    match run(&service, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => match e.downcast::<RelationshipError>() {
            Ok(RelationshipError::Store(e)) => Err(e),
            Ok(e) => {
                tracing::debug!("Command rejected: {}", e);
                let body = json!({
                    "error": e.to_string(),
                    "code": e.error_code(),
                    "status": e.status_code(),
                });
                eprintln!("{}", serde_json::to_string_pretty(&body)?);
                std::process::exit(2);
            }
            Err(e) => Err(e),
        },
    }
}

async fn run(
    service: &RelationshipService<PgStore>,
    command: Command,
) -> anyhow::Result<serde_json::Value> {
    let output = match command {
        Command::Send { from, to, duration_ms } => {
            to_json(&service.send_request(&from, &to, duration_ms).await?)?
        }
        Command::Accept { from, to } => to_json(&service.accept_request(&from, &to).await?)?,
        Command::Reject { from, to } => to_json(&service.reject_request(&from, &to).await?)?,
        Command::Withdraw { from, to } => to_json(&service.remove_request(&from, &to).await?)?,
        Command::Unfriend { user, friend } => to_json(&service.remove_friend(&user, &friend).await?)?,
        Command::Friends { user, detailed: false } => to_json(&service.get_friends(&user).await?)?,
        Command::Friends { user, detailed: true } => {
            to_json(&service.get_friendships(&user).await?)?
        }
        Command::Requests { user } => to_json(&service.get_requests(&user).await?)?,
        Command::IsFriend { user1, user2 } => {
            let friends = service.is_friend(&user1, &user2).await?;
            json!({ "user1": user1, "user2": user2, "is_friend": friends })
        }
        // clap only lets `user` be absent when --all is given.
        Command::Sweep { user: Some(user), .. } => {
            to_json(&service.remove_expired_friends(&user).await?)?
        }
        Command::Sweep { user: None, .. } => to_json(&service.remove_all_expired_friends().await?)?,
    };
    Ok(output)
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
