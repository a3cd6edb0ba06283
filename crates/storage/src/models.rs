use anyhow::Context;
use chrono::{DateTime, Utc};
use domain::{BlockedUser, CommunityId, Suggestion, SuggestionStatus};
use sqlx::FromRow;

// SQLite has no unsigned 64-bit integer; platform ids are stored bit-for-bit as i64.
pub(crate) fn to_db(id: u64) -> i64 {
    id as i64
}

pub(crate) fn from_db(id: i64) -> u64 {
    id as u64
}

#[derive(FromRow)]
pub struct SqlSuggestion {
    pub community_id: i64,
    pub id: i64,
    pub author_id: i64,
    pub content: String,
    pub status: String,
    pub mirror_message_id: i64,
    pub mirror_thread_id: i64,
    pub reviewer_id: Option<i64>,
    pub remarks: Option<String>,
    pub up_votes: i64,
    pub down_votes: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SqlSuggestion> for Suggestion {
    type Error = anyhow::Error;

    fn try_from(sql: SqlSuggestion) -> Result<Self, Self::Error> {
        let status: SuggestionStatus = sql.status.parse().with_context(|| {
            format!(
                "suggestion {} in community {} has status {:?}",
                sql.id,
                from_db(sql.community_id),
                sql.status
            )
        })?;
        Ok(Suggestion {
            community_id: CommunityId::new(from_db(sql.community_id)),
            id: sql.id,
            author_id: from_db(sql.author_id),
            content: sql.content,
            status,
            mirror_message_id: from_db(sql.mirror_message_id),
            mirror_thread_id: from_db(sql.mirror_thread_id),
            reviewer_id: sql.reviewer_id.map(from_db),
            remarks: sql.remarks,
            // negative counts left behind by older builds clamp to zero
            up_votes: u32::try_from(sql.up_votes.max(0)).unwrap_or(u32::MAX),
            down_votes: u32::try_from(sql.down_votes.max(0)).unwrap_or(u32::MAX),
            created_at: sql.created_at,
        })
    }
}

#[derive(FromRow)]
pub struct SqlBlockedUser {
    pub community_id: i64,
    pub user_id: i64,
    pub reviewer_id: i64,
    pub reason: Option<String>,
    pub blocked_at: DateTime<Utc>,
}

impl From<SqlBlockedUser> for BlockedUser {
    fn from(sql: SqlBlockedUser) -> Self {
        BlockedUser {
            community_id: CommunityId::new(from_db(sql.community_id)),
            user_id: from_db(sql.user_id),
            reviewer_id: from_db(sql.reviewer_id),
            reason: sql.reason,
            blocked_at: sql.blocked_at,
        }
    }
}
