pub mod clock;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod relationship;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use db::connection::get_db_pool;
pub use db::{MemoryStore, PgStore, RelationshipStore};
pub use error::{RelationshipError, RelationshipResult};
pub use models::{FriendRequest, Friendship, RequestStatus, UserId};
pub use relationship::{PairKey, RelationshipService};
pub use utils::config::Config;

// Re-export common types
pub use sqlx::PgPool;
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
