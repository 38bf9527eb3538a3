use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::FriendshipRepository;
use crate::error::{RelationshipError, RelationshipResult};
use crate::models::{Friendship, UserId};
use crate::relationship::pair::PairKey;

/// Active time-bounded friendships: removal, membership and the lazy expiry
/// sweep. Friendships are formed by the accept path of the request store.
pub struct FriendshipStore<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized> Clone for FriendshipStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: FriendshipRepository + ?Sized> FriendshipStore<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn remove_friend(
        &self,
        user1: &UserId,
        user2: &UserId,
    ) -> RelationshipResult<Friendship> {
        let pair = PairKey::new(user1, user2);
        let friendship = self
            .store
            .take_friendship(&pair)
            .await?
            .ok_or_else(|| RelationshipError::friendship_not_found(user1, user2))?;

        info!("Friendship {} removed", pair);
        Ok(friendship)
    }

    /// Identifiers of everyone `user` currently has a friendship record with.
    pub async fn get_friends(&self, user: &UserId) -> RelationshipResult<Vec<UserId>> {
        let friendships = self.store.friendships_for(user).await?;
        let mut friends: Vec<UserId> = friendships
            .iter()
            .filter_map(|friendship| friendship.other(user).cloned())
            .collect();
        friends.sort();
        Ok(friends)
    }

    pub async fn get_friendships(&self, user: &UserId) -> RelationshipResult<Vec<Friendship>> {
        Ok(self.store.friendships_for(user).await?)
    }

    /// True when the users are the same person or a friendship record exists
    /// for the pair. Collaborators gate actions on this, and acting on your own
    /// behalf must always pass.
    pub async fn is_friend(&self, user1: &UserId, user2: &UserId) -> RelationshipResult<bool> {
        if user1 == user2 {
            return Ok(true);
        }
        let found = self
            .store
            .find_friendship(&PairKey::new(user1, user2))
            .await?
            .is_some();
        debug!("is_friend({}, {}) = {}", user1, user2, found);
        Ok(found)
    }

    /// Removes every friendship of `user` whose `created_on + duration` is at or
    /// before now. Safe to call as often as wanted; a second call with nothing
    /// newly expired removes nothing.
    pub async fn remove_expired_friends(&self, user: &UserId) -> RelationshipResult<Vec<Friendship>> {
        let now = self.clock.now();
        let friendships = self.store.friendships_for(user).await?;

        let mut removed = Vec::new();
        for friendship in friendships.iter().filter(|f| f.is_expired_at(now)) {
            // A concurrent sweep or unfriend may already have taken it.
            if let Some(friendship) = self
                .store
                .take_friendship_if_expired(&friendship.pair(), now)
                .await?
            {
                removed.push(friendship);
            }
        }

        if !removed.is_empty() {
            info!("Removed {} expired friendships of {}", removed.len(), user);
        }
        Ok(removed)
    }

    /// Sweeps expired friendships for every user at once.
    pub async fn remove_all_expired_friends(&self) -> RelationshipResult<Vec<Friendship>> {
        let removed = self.store.take_expired_friendships(self.clock.now()).await?;
        if !removed.is_empty() {
            info!("Removed {} expired friendships", removed.len());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::MemoryStore;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn setup() -> (FriendshipStore<MemoryStore>, Arc<MemoryStore>, ManualClock) {
        let clock = ManualClock::at_millis(10_000);
        let memory = Arc::new(MemoryStore::new());
        let store = FriendshipStore::new(Arc::clone(&memory), Arc::new(clock.clone()));
        (store, memory, clock)
    }

    #[tokio::test]
    async fn test_is_friend_is_symmetric_and_reflexive() {
        let (store, memory, clock) = setup();
        let (a, b, c) = (user("a"), user("b"), user("c"));
        memory.seed_friendship(&b, &a, clock.now(), 1_000).await;

        assert!(store.is_friend(&a, &b).await.unwrap());
        assert!(store.is_friend(&b, &a).await.unwrap());
        assert!(!store.is_friend(&a, &c).await.unwrap());
        assert!(!store.is_friend(&c, &a).await.unwrap());
        assert!(store.is_friend(&c, &c).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_friend_then_not_found() {
        let (store, memory, clock) = setup();
        let (a, b) = (user("a"), user("b"));
        memory.seed_friendship(&a, &b, clock.now(), 1_000).await;

        let removed = store.remove_friend(&b, &a).await.unwrap();
        assert_eq!(removed.pair(), PairKey::new(&a, &b));
        assert!(!store.is_friend(&a, &b).await.unwrap());

        let err = store.remove_friend(&a, &b).await.unwrap_err();
        assert!(matches!(err, RelationshipError::FriendshipNotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_get_friends_lists_the_other_side() {
        let (store, memory, clock) = setup();
        let me = user("me");
        for friend in ["zed", "amy", "kim"] {
            memory.seed_friendship(&user(friend), &me, clock.now(), 1_000).await;
        }

        let friends = store.get_friends(&me).await.unwrap();
        assert_eq!(friends, vec![user("amy"), user("kim"), user("zed")]);
        assert_eq!(store.get_friends(&user("amy")).await.unwrap(), vec![me.clone()]);
        assert!(store.get_friends(&user("stranger")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expiry_sweep_respects_boundary() {
        let (store, memory, clock) = setup();
        let (a, b) = (user("a"), user("b"));
        memory.seed_friendship(&a, &b, clock.now(), 1_000).await;

        clock.advance_millis(999);
        assert!(store.remove_expired_friends(&a).await.unwrap().is_empty());
        assert!(store.is_friend(&a, &b).await.unwrap());

        clock.advance_millis(1);
        let removed = store.remove_expired_friends(&a).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!store.is_friend(&a, &b).await.unwrap());
        assert!(!store.is_friend(&b, &a).await.unwrap());

        // Idempotent once swept.
        assert!(store.remove_expired_friends(&a).await.unwrap().is_empty());
        assert!(store.remove_expired_friends(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_only_touches_expired_friendships_of_user() {
        let (store, memory, clock) = setup();
        let me = user("me");
        memory.seed_friendship(&me, &user("short"), clock.now(), 100).await;
        memory.seed_friendship(&me, &user("long"), clock.now(), 10_000).await;
        memory.seed_friendship(&user("x"), &user("y"), clock.now(), 100).await;

        clock.advance_millis(500);
        let removed = store.remove_expired_friends(&me).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.get_friends(&me).await.unwrap(), vec![user("long")]);
        // Lazy: x and y stay until someone sweeps them.
        assert!(store.is_friend(&user("x"), &user("y")).await.unwrap());

        let swept = store.remove_all_expired_friends().await.unwrap();
        assert_eq!(swept.len(), 1);
        assert!(!store.is_friend(&user("x"), &user("y")).await.unwrap());
    }
}
