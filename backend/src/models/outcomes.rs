use serde::Serialize;

use super::{FriendRequest, Friendship};

pub const MSG_SENT_REQUEST: &str = "Sent request!";
pub const MSG_ACCEPTED_REQUEST: &str = "Accepted request!";
pub const MSG_REJECTED_REQUEST: &str = "Rejected request!";
pub const MSG_REMOVED_REQUEST: &str = "Removed request!";
pub const MSG_UNFRIENDED: &str = "Unfriended!";
pub const MSG_REMOVED_EXPIRED: &str = "Removed expired friends!";

#[derive(Debug, Clone, Serialize)]
pub struct SentRequest {
    pub msg: &'static str,
    pub request: FriendRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedRequest {
    pub msg: &'static str,
    pub request: FriendRequest,
    pub friend: Friendship,
}

/// Outcome of an operation that only reports success.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub msg: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub msg: &'static str,
    pub removed: Vec<Friendship>,
}
