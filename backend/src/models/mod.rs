pub mod friendships;
pub mod outcomes;
pub mod requests;
pub mod users;

pub use friendships::Friendship;
pub use outcomes::{AcceptedRequest, Resolution, SentRequest, SweepReport};
pub use requests::{FriendRequest, RequestStatus};
pub use users::UserId;
