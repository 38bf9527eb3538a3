use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::store::{
    FriendshipRepository, PendingAction, PendingInsert, PendingResolution, RequestRepository,
};
use crate::models::{FriendRequest, Friendship, UserId};
use crate::relationship::pair::PairKey;

#[derive(Debug, Default)]
struct MemoryState {
    pending: HashMap<PairKey, FriendRequest>,
    pending_by_user: HashMap<UserId, BTreeSet<PairKey>>,
    resolved: Vec<FriendRequest>,
    resolved_by_user: HashMap<UserId, Vec<usize>>,
    friendships: HashMap<PairKey, Friendship>,
    friends_by_user: HashMap<UserId, BTreeSet<UserId>>,
}

impl MemoryState {
    fn add_pending(&mut self, pair: PairKey, request: FriendRequest) {
        for user in [pair.lo(), pair.hi()] {
            self.pending_by_user
                .entry(user.clone())
                .or_default()
                .insert(pair.clone());
        }
        self.pending.insert(pair, request);
    }

    fn remove_pending(&mut self, pair: &PairKey) -> Option<FriendRequest> {
        let request = self.pending.remove(pair)?;
        for user in [pair.lo(), pair.hi()] {
            if let Some(pairs) = self.pending_by_user.get_mut(user) {
                pairs.remove(pair);
                if pairs.is_empty() {
                    self.pending_by_user.remove(user);
                }
            }
        }
        Some(request)
    }

    fn append_resolved(&mut self, request: FriendRequest) {
        let index = self.resolved.len();
        for user in [&request.from, &request.to] {
            self.resolved_by_user.entry(user.clone()).or_default().push(index);
        }
        self.resolved.push(request);
    }

    fn add_friendship(&mut self, pair: PairKey, friendship: Friendship) {
        self.friends_by_user
            .entry(pair.lo().clone())
            .or_default()
            .insert(pair.hi().clone());
        self.friends_by_user
            .entry(pair.hi().clone())
            .or_default()
            .insert(pair.lo().clone());
        self.friendships.insert(pair, friendship);
    }

    fn remove_friendship(&mut self, pair: &PairKey) -> Option<Friendship> {
        let friendship = self.friendships.remove(pair)?;
        for (user, friend) in [(pair.lo(), pair.hi()), (pair.hi(), pair.lo())] {
            if let Some(friends) = self.friends_by_user.get_mut(user) {
                friends.remove(friend);
                if friends.is_empty() {
                    self.friends_by_user.remove(user);
                }
            }
        }
        Some(friendship)
    }
}

/// In-process store. One mutex covers every check-and-write sequence, so each
/// trait call is atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a friendship directly, bypassing the request protocol.
    #[cfg(test)]
    pub(crate) async fn seed_friendship(
        &self,
        a: &UserId,
        b: &UserId,
        created_on: DateTime<Utc>,
        duration_ms: i64,
    ) -> Friendship {
        let friendship = Friendship::new(a, b, created_on, duration_ms);
        let mut state = self.state.lock().await;
        state.add_friendship(friendship.pair(), friendship.clone());
        friendship
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn insert_pending(&self, request: FriendRequest) -> Result<PendingInsert> {
        let mut state = self.state.lock().await;
        let pair = request.pair();
        if state.friendships.contains_key(&pair) {
            return Ok(PendingInsert::AlreadyFriends);
        }
        if state.pending.contains_key(&pair) {
            return Ok(PendingInsert::PendingExists);
        }
        state.add_pending(pair, request.clone());
        Ok(PendingInsert::Inserted(request))
    }

    async fn resolve_pending(&self, pair: &PairKey, action: PendingAction) -> Result<PendingResolution> {
        let mut state = self.state.lock().await;
        let Some(pending) = state.pending.get(pair) else {
            return Ok(PendingResolution::NoPending);
        };

        let (record, friendship) = action.outcome(pending);
        if friendship.is_some() && state.friendships.contains_key(pair) {
            return Ok(PendingResolution::AlreadyFriends);
        }

        let Some(pending) = state.remove_pending(pair) else {
            return Ok(PendingResolution::NoPending);
        };
        if let Some(record) = &record {
            state.append_resolved(record.clone());
        }
        if let Some(friendship) = &friendship {
            state.add_friendship(pair.clone(), friendship.clone());
        }

        Ok(PendingResolution::Resolved {
            pending,
            record,
            friendship,
        })
    }

    async fn requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let state = self.state.lock().await;
        let resolved = state
            .resolved_by_user
            .get(user)
            .into_iter()
            .flatten()
            .filter_map(|&index| state.resolved.get(index));
        let pending = state
            .pending_by_user
            .get(user)
            .into_iter()
            .flatten()
            .filter_map(|pair| state.pending.get(pair));

        let mut requests: Vec<FriendRequest> = resolved.chain(pending).cloned().collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }
}

#[async_trait]
impl FriendshipRepository for MemoryStore {
    async fn find_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>> {
        let state = self.state.lock().await;
        Ok(state.friendships.get(pair).cloned())
    }

    async fn take_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>> {
        let mut state = self.state.lock().await;
        Ok(state.remove_friendship(pair))
    }

    async fn take_friendship_if_expired(
        &self,
        pair: &PairKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Friendship>> {
        let mut state = self.state.lock().await;
        let expired = state
            .friendships
            .get(pair)
            .is_some_and(|friendship| friendship.is_expired_at(now));
        if !expired {
            return Ok(None);
        }
        Ok(state.remove_friendship(pair))
    }

    async fn friendships_for(&self, user: &UserId) -> Result<Vec<Friendship>> {
        let state = self.state.lock().await;
        let Some(friends) = state.friends_by_user.get(user) else {
            return Ok(Vec::new());
        };
        Ok(friends
            .iter()
            .filter_map(|friend| state.friendships.get(&PairKey::new(user, friend)).cloned())
            .collect())
    }

    async fn take_expired_friendships(&self, now: DateTime<Utc>) -> Result<Vec<Friendship>> {
        let mut state = self.state.lock().await;
        let expired: Vec<PairKey> = state
            .friendships
            .iter()
            .filter(|(_, friendship)| friendship.is_expired_at(now))
            .map(|(pair, _)| pair.clone())
            .collect();
        Ok(expired
            .iter()
            .filter_map(|pair| state.remove_friendship(pair))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn pair(a: &str, b: &str) -> PairKey {
        PairKey::new(&user(a), &user(b))
    }

    #[tokio::test]
    async fn test_insert_pending_rejects_either_direction() {
        let store = MemoryStore::new();
        let first = FriendRequest::pending(user("a"), user("b"), 10, at(0));
        assert_eq!(
            store.insert_pending(first.clone()).await.unwrap(),
            PendingInsert::Inserted(first)
        );

        let reverse = FriendRequest::pending(user("b"), user("a"), 10, at(1));
        assert_eq!(store.insert_pending(reverse).await.unwrap(), PendingInsert::PendingExists);
    }

    #[tokio::test]
    async fn test_insert_pending_refuses_pair_with_friendship() {
        let store = MemoryStore::new();
        store.seed_friendship(&user("a"), &user("b"), at(0), 100).await;

        let request = FriendRequest::pending(user("b"), user("a"), 10, at(1));
        assert_eq!(store.insert_pending(request).await.unwrap(), PendingInsert::AlreadyFriends);
        assert!(store.requests_for(&user("a")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_pending_hands_out_once() {
        let store = MemoryStore::new();
        let request = FriendRequest::pending(user("a"), user("b"), 10, at(0));
        store.insert_pending(request.clone()).await.unwrap();

        let first = store.resolve_pending(&pair("b", "a"), PendingAction::Withdraw).await.unwrap();
        assert_eq!(
            first,
            PendingResolution::Resolved {
                pending: request,
                record: None,
                friendship: None,
            }
        );
        let second = store.resolve_pending(&pair("b", "a"), PendingAction::Withdraw).await.unwrap();
        assert_eq!(second, PendingResolution::NoPending);
        assert!(store.requests_for(&user("a")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_writes_record_and_friendship_together() {
        let store = MemoryStore::new();
        let request = FriendRequest::pending(user("a"), user("b"), 500, at(0));
        store.insert_pending(request).await.unwrap();

        let resolution = store
            .resolve_pending(&pair("a", "b"), PendingAction::Accept { at: at(40) })
            .await
            .unwrap();
        let PendingResolution::Resolved { record, friendship, .. } = resolution else {
            panic!("expected the pending request to resolve");
        };
        assert_eq!(record.map(|r| r.status), Some(RequestStatus::Accepted));
        assert_eq!(friendship.map(|f| f.created_on), Some(at(40)));

        let history = store.requests_for(&user("b")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, RequestStatus::Accepted);
        assert!(store.find_friendship(&pair("b", "a")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_accept_onto_existing_friendship_changes_nothing() {
        let store = MemoryStore::new();
        let request = FriendRequest::pending(user("a"), user("b"), 500, at(0));
        store.insert_pending(request.clone()).await.unwrap();
        let existing = store.seed_friendship(&user("a"), &user("b"), at(0), 9_000).await;

        let resolution = store
            .resolve_pending(&pair("a", "b"), PendingAction::Accept { at: at(40) })
            .await
            .unwrap();
        assert_eq!(resolution, PendingResolution::AlreadyFriends);
        assert_eq!(store.requests_for(&user("a")).await.unwrap(), vec![request]);
        assert_eq!(store.find_friendship(&pair("a", "b")).await.unwrap(), Some(existing));
    }

    #[tokio::test]
    async fn test_requests_for_merges_history_and_pending_in_order() {
        let store = MemoryStore::new();
        store
            .insert_pending(FriendRequest::pending(user("a"), user("b"), 10, at(0)))
            .await
            .unwrap();
        store
            .resolve_pending(&pair("a", "b"), PendingAction::Reject { at: at(5) })
            .await
            .unwrap();
        store
            .insert_pending(FriendRequest::pending(user("c"), user("a"), 10, at(10)))
            .await
            .unwrap();
        store
            .insert_pending(FriendRequest::pending(user("c"), user("d"), 10, at(20)))
            .await
            .unwrap();

        let requests = store.requests_for(&user("a")).await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].status, RequestStatus::Rejected);
        assert!(requests[1].is_pending());
        assert_eq!(store.requests_for(&user("c")).await.unwrap().len(), 2);
        assert_eq!(store.requests_for(&user("d")).await.unwrap().len(), 1);
        assert!(store.requests_for(&user("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_friendship_index_follows_inserts_and_removals() {
        let store = MemoryStore::new();
        let ab = store.seed_friendship(&user("a"), &user("b"), at(0), 100).await;
        let ac = store.seed_friendship(&user("a"), &user("c"), at(0), 100).await;

        assert_eq!(store.friendships_for(&user("a")).await.unwrap().len(), 2);
        assert_eq!(store.friendships_for(&user("b")).await.unwrap(), vec![ab.clone()]);

        assert_eq!(store.take_friendship(&ab.pair()).await.unwrap(), Some(ab.clone()));
        assert!(store.friendships_for(&user("b")).await.unwrap().is_empty());
        assert_eq!(store.friendships_for(&user("a")).await.unwrap(), vec![ac]);
        assert_eq!(store.take_friendship(&ab.pair()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_take_if_expired_leaves_live_friendships() {
        let store = MemoryStore::new();
        let f = store.seed_friendship(&user("a"), &user("b"), at(0), 100).await;

        assert!(store.take_friendship_if_expired(&f.pair(), at(99)).await.unwrap().is_none());
        assert!(store.find_friendship(&f.pair()).await.unwrap().is_some());
        assert_eq!(
            store.take_friendship_if_expired(&f.pair(), at(100)).await.unwrap(),
            Some(f.clone())
        );
        assert!(store.find_friendship(&f.pair()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_take_expired_friendships_sweeps_everyone() {
        let store = MemoryStore::new();
        store.seed_friendship(&user("a"), &user("b"), at(0), 10).await;
        store.seed_friendship(&user("c"), &user("d"), at(0), 20).await;
        store.seed_friendship(&user("e"), &user("f"), at(0), 1_000).await;

        let removed = store.take_expired_friendships(at(20)).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.take_expired_friendships(at(20)).await.unwrap().is_empty());
        assert_eq!(store.friendships_for(&user("e")).await.unwrap().len(), 1);
    }
}
