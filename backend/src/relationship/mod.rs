pub mod friendships;
pub mod pair;
pub mod requests;
pub mod service;

pub use friendships::FriendshipStore;
pub use pair::{canonicalize, PairKey};
pub use requests::RequestStore;
pub use service::RelationshipService;
