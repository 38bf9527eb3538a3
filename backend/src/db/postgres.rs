use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::store::{
    FriendshipRepository, PendingAction, PendingInsert, PendingResolution, RequestRepository,
};
use crate::models::{FriendRequest, Friendship, UserId};
use crate::relationship::pair::PairKey;

const REQUEST_COLUMNS: &str = "id, from_user, to_user, status, duration_ms, created_at";
const FRIENDSHIP_COLUMNS: &str = "user_lo, user_hi, created_on, duration_ms";

#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    from_user: String,
    to_user: String,
    status: String,
    duration_ms: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for FriendRequest {
    type Error = anyhow::Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        Ok(FriendRequest {
            id: row.id,
            from: UserId::from(row.from_user),
            to: UserId::from(row.to_user),
            status: row.status.parse()?,
            duration_ms: row.duration_ms,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct FriendshipRow {
    user_lo: String,
    user_hi: String,
    created_on: DateTime<Utc>,
    duration_ms: i64,
}

impl From<FriendshipRow> for Friendship {
    fn from(row: FriendshipRow) -> Self {
        Friendship {
            user1: UserId::from(row.user_lo),
            user2: UserId::from(row.user_hi),
            created_on: row.created_on,
            duration_ms: row.duration_ms,
        }
    }
}

/// PostgreSQL-backed store.
///
/// Writes that depend on a pair's current state take a transaction-scoped
/// advisory lock on the pair first, so checks and writes for one pair never
/// interleave. Removals are single `DELETE ... RETURNING` statements.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_pair(conn: &mut PgConnection, pair: &PairKey) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(pair.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_request(conn: &mut PgConnection, request: &FriendRequest) -> Result<()> {
    let pair = request.pair();
    sqlx::query(
        r#"
        INSERT INTO friend_requests (id, from_user, to_user, user_lo, user_hi, status, duration_ms, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(request.id)
    .bind(request.from.as_str())
    .bind(request.to.as_str())
    .bind(pair.lo().as_str())
    .bind(pair.hi().as_str())
    .bind(request.status.as_str())
    .bind(request.duration_ms)
    .bind(request.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl RequestRepository for PgStore {
    async fn insert_pending(&self, request: FriendRequest) -> Result<PendingInsert> {
        let pair = request.pair();
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut tx, &pair).await?;

        let friends = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_lo = $1 AND user_hi = $2)",
        )
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .fetch_one(&mut *tx)
        .await?;
        if friends {
            return Ok(PendingInsert::AlreadyFriends);
        }

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            INSERT INTO friend_requests (id, from_user, to_user, user_lo, user_hi, status, duration_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            ON CONFLICT (user_lo, user_hi) WHERE status = 'pending' DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(request.id)
        .bind(request.from.as_str())
        .bind(request.to.as_str())
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .bind(request.duration_ms)
        .bind(request.created_at)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(PendingInsert::PendingExists);
        };

        tx.commit().await?;
        Ok(PendingInsert::Inserted(FriendRequest::try_from(row)?))
    }

    async fn resolve_pending(&self, pair: &PairKey, action: PendingAction) -> Result<PendingResolution> {
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut tx, pair).await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            DELETE FROM friend_requests
            WHERE user_lo = $1 AND user_hi = $2 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(PendingResolution::NoPending);
        };
        let pending = FriendRequest::try_from(row)?;
        let (record, friendship) = action.outcome(&pending);

        if let Some(friendship) = &friendship {
            let inserted = sqlx::query_scalar::<_, String>(
                r#"
                INSERT INTO friendships (user_lo, user_hi, created_on, duration_ms, expires_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_lo, user_hi) DO NOTHING
                RETURNING user_lo
                "#,
            )
            .bind(friendship.user1.as_str())
            .bind(friendship.user2.as_str())
            .bind(friendship.created_on)
            .bind(friendship.duration_ms)
            .bind(friendship.expires_at())
            .fetch_optional(&mut *tx)
            .await?;
            if inserted.is_none() {
                // Dropping the transaction puts the pending request back.
                return Ok(PendingResolution::AlreadyFriends);
            }
        }
        if let Some(record) = &record {
            insert_request(&mut tx, record).await?;
        }

        tx.commit().await?;
        Ok(PendingResolution::Resolved {
            pending,
            record,
            friendship,
        })
    }

    async fn requests_for(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM friend_requests
            WHERE from_user = $1 OR to_user = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FriendRequest::try_from).collect()
    }
}

#[async_trait]
impl FriendshipRepository for PgStore {
    async fn find_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>> {
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE user_lo = $1 AND user_hi = $2
            "#
        ))
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Friendship::from))
    }

    async fn take_friendship(&self, pair: &PairKey) -> Result<Option<Friendship>> {
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            DELETE FROM friendships
            WHERE user_lo = $1 AND user_hi = $2
            RETURNING {FRIENDSHIP_COLUMNS}
            "#
        ))
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Friendship::from))
    }

    async fn take_friendship_if_expired(
        &self,
        pair: &PairKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Friendship>> {
        let row = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            DELETE FROM friendships
            WHERE user_lo = $1 AND user_hi = $2 AND expires_at <= $3
            RETURNING {FRIENDSHIP_COLUMNS}
            "#
        ))
        .bind(pair.lo().as_str())
        .bind(pair.hi().as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Friendship::from))
    }

    async fn friendships_for(&self, user: &UserId) -> Result<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            SELECT {FRIENDSHIP_COLUMNS}
            FROM friendships
            WHERE user_lo = $1 OR user_hi = $1
            ORDER BY created_on ASC
            "#
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }

    async fn take_expired_friendships(&self, now: DateTime<Utc>) -> Result<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            r#"
            DELETE FROM friendships
            WHERE expires_at <= $1
            RETURNING {FRIENDSHIP_COLUMNS}
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }
}
