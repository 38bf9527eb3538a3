use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::relationship::pair::PairKey;

/// An active, time-bounded friendship. `user1`/`user2` are always stored in
/// canonical order, so two records for the same pair compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub user1: UserId,
    pub user2: UserId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_on: DateTime<Utc>,
    pub duration_ms: i64,
}

impl Friendship {
    pub fn new(a: &UserId, b: &UserId, created_on: DateTime<Utc>, duration_ms: i64) -> Self {
        let pair = PairKey::new(a, b);
        let (user1, user2) = pair.into_parts();
        Self {
            user1,
            user2,
            created_on,
            duration_ms,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.user1, &self.user2)
    }

    /// `created_on + duration`, saturating at the latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        TimeDelta::try_milliseconds(self.duration_ms)
            .and_then(|duration| self.created_on.checked_add_signed(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }

    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.user1 == user {
            Some(&self.user2)
        } else if &self.user2 == user {
            Some(&self.user1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_new_canonicalizes_users() {
        let f = Friendship::new(&"zoe".into(), &"adam".into(), at(0), 10);
        assert_eq!(f.user1.as_str(), "adam");
        assert_eq!(f.user2.as_str(), "zoe");
        assert_eq!(f, Friendship::new(&"adam".into(), &"zoe".into(), at(0), 10));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let f = Friendship::new(&"a".into(), &"b".into(), at(5_000), 1_000);
        assert_eq!(f.expires_at(), at(6_000));
        assert!(!f.is_expired_at(at(5_999)));
        assert!(f.is_expired_at(at(6_000)));
        assert!(f.is_expired_at(at(7_000)));
    }

    #[test]
    fn test_zero_duration_expires_immediately() {
        let f = Friendship::new(&"a".into(), &"b".into(), at(100), 0);
        assert!(f.is_expired_at(at(100)));
    }

    #[test]
    fn test_huge_duration_saturates() {
        let f = Friendship::new(&"a".into(), &"b".into(), at(0), i64::MAX);
        assert_eq!(f.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!f.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_other_side() {
        let f = Friendship::new(&"a".into(), &"b".into(), at(0), 1);
        assert_eq!(f.other(&"a".into()).map(UserId::as_str), Some("b"));
        assert_eq!(f.other(&"b".into()).map(UserId::as_str), Some("a"));
        assert!(f.other(&"c".into()).is_none());
    }

    #[test]
    fn test_created_on_serializes_as_epoch_millis() {
        let f = Friendship::new(&"a".into(), &"b".into(), at(1_700_000_000_123), 1000);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["created_on"], 1_700_000_000_123i64);
        assert_eq!(json["duration_ms"], 1000);
    }
}
