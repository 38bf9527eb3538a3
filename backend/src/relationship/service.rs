use std::sync::Arc;

use super::friendships::FriendshipStore;
use super::requests::RequestStore;
use crate::clock::{Clock, SystemClock};
use crate::db::RelationshipStore;
use crate::error::RelationshipResult;
use crate::models::outcomes::{
    MSG_ACCEPTED_REQUEST, MSG_REJECTED_REQUEST, MSG_REMOVED_EXPIRED, MSG_REMOVED_REQUEST,
    MSG_SENT_REQUEST, MSG_UNFRIENDED,
};
use crate::models::{
    AcceptedRequest, FriendRequest, Friendship, Resolution, SentRequest, SweepReport, UserId,
};

/// The single entry point collaborators use for friendships and friend
/// requests. Chat, albums and hangout suggestions only ever call
/// [`RelationshipService::is_friend`].
pub struct RelationshipService<S: ?Sized> {
    requests: RequestStore<S>,
    friendships: FriendshipStore<S>,
}

impl<S: ?Sized> Clone for RelationshipService<S> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            friendships: self.friendships.clone(),
        }
    }
}

impl<S: RelationshipStore + ?Sized> RelationshipService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let friendships = FriendshipStore::new(Arc::clone(&store), Arc::clone(&clock));
        let requests = RequestStore::new(store, clock);
        Self {
            requests,
            friendships,
        }
    }

    pub fn with_system_clock(store: Arc<S>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    pub async fn send_request(
        &self,
        from: &UserId,
        to: &UserId,
        duration_ms: i64,
    ) -> RelationshipResult<SentRequest> {
        let request = self.requests.send_request(from, to, duration_ms).await?;
        Ok(SentRequest {
            msg: MSG_SENT_REQUEST,
            request,
        })
    }

    pub async fn accept_request(&self, from: &UserId, to: &UserId) -> RelationshipResult<AcceptedRequest> {
        let (request, friend) = self.requests.accept_request(from, to).await?;
        Ok(AcceptedRequest {
            msg: MSG_ACCEPTED_REQUEST,
            request,
            friend,
        })
    }

    pub async fn reject_request(&self, from: &UserId, to: &UserId) -> RelationshipResult<Resolution> {
        self.requests.reject_request(from, to).await?;
        Ok(Resolution {
            msg: MSG_REJECTED_REQUEST,
        })
    }

    pub async fn remove_request(&self, from: &UserId, to: &UserId) -> RelationshipResult<Resolution> {
        self.requests.remove_request(from, to).await?;
        Ok(Resolution {
            msg: MSG_REMOVED_REQUEST,
        })
    }

    pub async fn get_requests(&self, user: &UserId) -> RelationshipResult<Vec<FriendRequest>> {
        self.requests.get_requests(user).await
    }

    pub async fn remove_friend(&self, user: &UserId, friend: &UserId) -> RelationshipResult<Resolution> {
        self.friendships.remove_friend(user, friend).await?;
        Ok(Resolution { msg: MSG_UNFRIENDED })
    }

    /// Current friends of `user`. Sweeps the user's expired friendships first,
    /// so nothing past its expiry is ever listed.
    pub async fn get_friends(&self, user: &UserId) -> RelationshipResult<Vec<UserId>> {
        self.friendships.remove_expired_friends(user).await?;
        self.friendships.get_friends(user).await
    }

    /// Like [`Self::get_friends`] but with full records, for showing time left.
    pub async fn get_friendships(&self, user: &UserId) -> RelationshipResult<Vec<Friendship>> {
        self.friendships.remove_expired_friends(user).await?;
        self.friendships.get_friendships(user).await
    }

    pub async fn is_friend(&self, user1: &UserId, user2: &UserId) -> RelationshipResult<bool> {
        self.friendships.is_friend(user1, user2).await
    }

    pub async fn remove_expired_friends(&self, user: &UserId) -> RelationshipResult<SweepReport> {
        let removed = self.friendships.remove_expired_friends(user).await?;
        Ok(SweepReport {
            msg: MSG_REMOVED_EXPIRED,
            removed,
        })
    }

    /// Session-start hook: keeps the user's friend list current on login.
    pub async fn on_login(&self, user: &UserId) -> RelationshipResult<SweepReport> {
        self.remove_expired_friends(user).await
    }

    pub async fn remove_all_expired_friends(&self) -> RelationshipResult<SweepReport> {
        let removed = self.friendships.remove_all_expired_friends().await?;
        Ok(SweepReport {
            msg: MSG_REMOVED_EXPIRED,
            removed,
        })
    }
}
