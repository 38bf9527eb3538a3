use thiserror::Error;

use crate::models::UserId;

pub type RelationshipResult<T> = Result<T, RelationshipError>;

/// Terminal outcome of a rejected relationship operation. Every domain variant
/// carries both identifiers so callers can format their own message.
#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("{user1} and {user2} are already friends!")]
    AlreadyFriends { user1: UserId, user2: UserId },

    #[error("Friend request between {from} and {to} already exists!")]
    RequestAlreadyExists { from: UserId, to: UserId },

    #[error("Friend request from {from} to {to} does not exist!")]
    RequestNotFound { from: UserId, to: UserId },

    #[error("Friendship between {user1} and {user2} does not exist!")]
    FriendshipNotFound { user1: UserId, user2: UserId },

    #[error("Friendship duration must be a non-negative number of milliseconds, got {0}")]
    InvalidDuration(i64),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl RelationshipError {
    /// HTTP status a routing layer should answer with.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RequestNotFound { .. } | Self::FriendshipNotFound { .. } => 404,
            Self::AlreadyFriends { .. } | Self::RequestAlreadyExists { .. } => 403,
            Self::InvalidDuration(_) => 400,
            Self::Store(_) => 500,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyFriends { .. } => "ALREADY_FRIENDS",
            Self::RequestAlreadyExists { .. } => "REQUEST_ALREADY_EXISTS",
            Self::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            Self::FriendshipNotFound { .. } => "FRIENDSHIP_NOT_FOUND",
            Self::InvalidDuration(_) => "INVALID_DURATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    pub(crate) fn already_friends(user1: &UserId, user2: &UserId) -> Self {
        Self::AlreadyFriends {
            user1: user1.clone(),
            user2: user2.clone(),
        }
    }

    pub(crate) fn request_already_exists(from: &UserId, to: &UserId) -> Self {
        Self::RequestAlreadyExists {
            from: from.clone(),
            to: to.clone(),
        }
    }

    pub(crate) fn request_not_found(from: &UserId, to: &UserId) -> Self {
        Self::RequestNotFound {
            from: from.clone(),
            to: to.clone(),
        }
    }

    pub(crate) fn friendship_not_found(user1: &UserId, user2: &UserId) -> Self {
        Self::FriendshipNotFound {
            user1: user1.clone(),
            user2: user2.clone(),
        }
    }
}
