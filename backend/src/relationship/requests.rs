use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::db::{PendingAction, PendingInsert, PendingResolution, RelationshipStore};
use crate::error::{RelationshipError, RelationshipResult};
use crate::models::{FriendRequest, Friendship, UserId};
use crate::relationship::pair::PairKey;

/// Friend request negotiation.
///
/// A pending request moves exactly once. The store removes it and writes the
/// accepted/rejected record (and, on accept, the friendship) as one atomic
/// step; concurrent resolvers of the same pair race on that step and only the
/// winner sees the request.
pub struct RequestStore<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized> Clone for RequestStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: RelationshipStore + ?Sized> RequestStore<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn send_request(
        &self,
        from: &UserId,
        to: &UserId,
        duration_ms: i64,
    ) -> RelationshipResult<FriendRequest> {
        if duration_ms < 0 {
            return Err(RelationshipError::InvalidDuration(duration_ms));
        }
        if from == to {
            return Err(RelationshipError::already_friends(from, to));
        }

        let request = FriendRequest::pending(from.clone(), to.clone(), duration_ms, self.clock.now());
        match self.store.insert_pending(request).await? {
            PendingInsert::Inserted(request) => {
                info!("Friend request {} sent from {} to {} ({} ms)", request.id, from, to, duration_ms);
                Ok(request)
            }
            PendingInsert::PendingExists => Err(RelationshipError::request_already_exists(from, to)),
            PendingInsert::AlreadyFriends => Err(RelationshipError::already_friends(from, to)),
        }
    }

    /// Accepts the pending request between the two users, whichever of them
    /// sent it. Returns the accepted history record and the new friendship.
    pub async fn accept_request(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> RelationshipResult<(FriendRequest, Friendship)> {
        let action = PendingAction::Accept { at: self.clock.now() };
        match self.resolve(from, to, action).await? {
            (pending, Some(accepted), Some(friendship)) => {
                info!(
                    "Friend request {} accepted; {} and {} are friends for {} ms",
                    pending.id, friendship.user1, friendship.user2, friendship.duration_ms
                );
                Ok((accepted, friendship))
            }
            (pending, ..) => Err(anyhow::anyhow!(
                "Store resolved friend request {} without an accepted record and friendship",
                pending.id
            )
            .into()),
        }
    }

    pub async fn reject_request(&self, from: &UserId, to: &UserId) -> RelationshipResult<FriendRequest> {
        let action = PendingAction::Reject { at: self.clock.now() };
        match self.resolve(from, to, action).await? {
            (pending, Some(rejected), _) => {
                info!("Friend request {} rejected", pending.id);
                Ok(rejected)
            }
            (pending, None, _) => Err(anyhow::anyhow!(
                "Store resolved friend request {} without a rejected record",
                pending.id
            )
            .into()),
        }
    }

    /// Withdraws the pending request without leaving a history record.
    pub async fn remove_request(&self, from: &UserId, to: &UserId) -> RelationshipResult<FriendRequest> {
        let (pending, ..) = self.resolve(from, to, PendingAction::Withdraw).await?;
        info!("Friend request {} withdrawn", pending.id);
        Ok(pending)
    }

    pub async fn get_requests(&self, user: &UserId) -> RelationshipResult<Vec<FriendRequest>> {
        let requests = self.store.requests_for(user).await?;
        debug!("Found {} friend requests involving {}", requests.len(), user);
        Ok(requests)
    }

    async fn resolve(
        &self,
        from: &UserId,
        to: &UserId,
        action: PendingAction,
    ) -> RelationshipResult<(FriendRequest, Option<FriendRequest>, Option<Friendship>)> {
        match self.store.resolve_pending(&PairKey::new(from, to), action).await? {
            PendingResolution::Resolved {
                pending,
                record,
                friendship,
            } => Ok((pending, record, friendship)),
            PendingResolution::NoPending => Err(RelationshipError::request_not_found(from, to)),
            PendingResolution::AlreadyFriends => {
                warn!("Pending request between {} and {} left in place: pair is already friends", from, to);
                Err(RelationshipError::already_friends(from, to))
            }
        }
    }
}
