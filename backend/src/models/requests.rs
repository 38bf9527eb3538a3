use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UserId;
use crate::relationship::pair::PairKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(anyhow::anyhow!("Unknown friend request status '{}'", other)),
        }
    }
}

/// A friend request record. `from` is the initiator; the record is addressed by
/// the unordered pair of both users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub from: UserId,
    pub to: UserId,
    pub status: RequestStatus,
    /// Lifetime in milliseconds of the friendship this request produces.
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn pending(from: UserId, to: UserId, duration_ms: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            status: RequestStatus::Pending,
            duration_ms,
            created_at,
        }
    }

    /// Builds the history record appended when this pending request is resolved.
    /// Direction and duration carry over; the resolved record gets its own id.
    pub fn resolved(&self, status: RequestStatus, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: self.from.clone(),
            to: self.to.clone(),
            status,
            duration_ms: self.duration_ms,
            created_at: at,
        }
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.from, &self.to)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in [RequestStatus::Pending, RequestStatus::Accepted, RequestStatus::Rejected] {
            assert_eq!(status.to_string().parse::<RequestStatus>().unwrap(), status);
        }
        assert!("expired".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_resolved_keeps_direction_and_duration() {
        let pending = FriendRequest::pending("alice".into(), "bob".into(), 1000, Utc::now());
        let accepted = pending.resolved(RequestStatus::Accepted, Utc::now());

        assert_eq!(accepted.from, pending.from);
        assert_eq!(accepted.to, pending.to);
        assert_eq!(accepted.duration_ms, 1000);
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_ne!(accepted.id, pending.id);
        assert_eq!(accepted.pair(), pending.pair());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }
}
