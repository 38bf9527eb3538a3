pub mod connection;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use connection::{get_db_pool, DatabaseConfig};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{
    FriendshipRepository, PendingAction, PendingInsert, PendingResolution, RelationshipStore,
    RequestRepository,
};
