use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{FriendRequest, Friendship, RequestStatus, UserId};
use crate::relationship::pair::PairKey;

/// Result of trying to open a new pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInsert {
    Inserted(FriendRequest),
    /// The pair already has a pending request, in either direction.
    PendingExists,
    /// The pair already has a friendship.
    AlreadyFriends,
}

/// How a pending request leaves the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Append an accepted record and form a friendship starting at `at`.
    Accept { at: DateTime<Utc> },
    /// Append a rejected record.
    Reject { at: DateTime<Utc> },
    /// Drop the pending request without a history record.
    Withdraw,
}

impl PendingAction {
    /// The history record and friendship this action writes for `pending`.
    /// Resolved records keep the pending request's direction and duration.
    pub fn outcome(&self, pending: &FriendRequest) -> (Option<FriendRequest>, Option<Friendship>) {
        match *self {
            PendingAction::Accept { at } => (
                Some(pending.resolved(RequestStatus::Accepted, at)),
                Some(Friendship::new(&pending.from, &pending.to, at, pending.duration_ms)),
            ),
            PendingAction::Reject { at } => (Some(pending.resolved(RequestStatus::Rejected, at)), None),
            PendingAction::Withdraw => (None, None),
        }
    }
}

/// Result of resolving the pending request of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingResolution {
    Resolved {
        pending: FriendRequest,
        record: Option<FriendRequest>,
        friendship: Option<Friendship>,
    },
    NoPending,
    /// Accepting would create a second friendship for the pair; nothing changed.
    AlreadyFriends,
}

/// Storage for friend request records.
///
/// Both methods are all-or-nothing and serialized per pair: at most one
/// pending record exists per pair, and a pending record is resolved by
/// exactly one caller.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Stores `request` as the pending record for its pair unless the pair
    /// already has a pending record or a friendship.
    async fn insert_pending(&self, request: FriendRequest) -> Result<PendingInsert>;

    /// Removes the pending record for `pair` and applies `action`. The removal,
    /// the history record and the friendship are written together or not at all.
    async fn resolve_pending(&self, pair: &PairKey, action: PendingAction) -> Result<PendingResolution>;

    /// Every record, pending or resolved, where `user` is either side. Oldest first.
    async fn requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>>;
}

/// Storage for active friendships, keyed by canonical pair. Friendships are
/// only created through [`RequestRepository::resolve_pending`].
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    async fn find_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>>;

    /// Removes and returns the friendship for `pair`, if any.
    async fn take_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>>;

    /// Removes and returns the friendship for `pair` only if it has expired at `now`.
    async fn take_friendship_if_expired(
        &self,
        pair: &PairKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Friendship>>;

    async fn friendships_for(&self, user: &UserId) -> Result<Vec<Friendship>>;

    /// Removes and returns every friendship that has expired at `now`.
    async fn take_expired_friendships(&self, now: DateTime<Utc>) -> Result<Vec<Friendship>>;
}

/// Everything the relationship service needs from one backend.
pub trait RelationshipStore: RequestRepository + FriendshipRepository {}

impl<T: RequestRepository + FriendshipRepository> RelationshipStore for T {}
