use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type UserId = u64;
pub type RoleId = u64;

/// Tenant scope. Every suggestion and block entry is partitioned by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(u64);

impl CommunityId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Suggested,
    Rejected,
    Implemented,
    Accepted,
    Removed,
    Duplicate,
    AlreadyImplemented,
    AlreadyPlanned,
}

impl SuggestionStatus {
    pub const ALL: [SuggestionStatus; 8] = [
        SuggestionStatus::Suggested,
        SuggestionStatus::Rejected,
        SuggestionStatus::Implemented,
        SuggestionStatus::Accepted,
        SuggestionStatus::Removed,
        SuggestionStatus::Duplicate,
        SuggestionStatus::AlreadyImplemented,
        SuggestionStatus::AlreadyPlanned,
    ];

    /// Stable name used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Suggested => "suggested",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Implemented => "implemented",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Removed => "removed",
            SuggestionStatus::Duplicate => "duplicate",
            SuggestionStatus::AlreadyImplemented => "already_implemented",
            SuggestionStatus::AlreadyPlanned => "already_planned",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SuggestionStatus::Suggested)
    }
}

/// Humanised upper-case form, e.g. `ALREADY IMPLEMENTED`.
impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().replace('_', " ").to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown suggestion status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for SuggestionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        SuggestionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Reference to the external representation of a suggestion.
/// A zero `message_id` means the suggestion has not been published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRef {
    pub message_id: u64,
    #[serde(default)]
    pub thread_id: u64,
}

impl MirrorRef {
    pub fn is_published(&self) -> bool {
        self.message_id != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: u32,
    pub down: u32,
}

impl VoteTally {
    pub fn new(up: u32, down: u32) -> Self {
        Self { up, down }
    }

    pub fn is_zero(&self) -> bool {
        self.up == 0 && self.down == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub community_id: CommunityId,
    pub id: i64,
    pub author_id: UserId,
    pub content: String,
    pub status: SuggestionStatus,
    pub mirror_message_id: u64,
    pub mirror_thread_id: u64,
    pub reviewer_id: Option<UserId>,
    pub remarks: Option<String>,
    pub up_votes: u32,
    pub down_votes: u32,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(
        community_id: CommunityId,
        id: i64,
        author_id: UserId,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            community_id,
            id,
            author_id,
            content,
            status: SuggestionStatus::Suggested,
            mirror_message_id: 0,
            mirror_thread_id: 0,
            reviewer_id: None,
            remarks: None,
            up_votes: 0,
            down_votes: 0,
            created_at,
        }
    }

    pub fn score(&self) -> i64 {
        i64::from(self.up_votes) - i64::from(self.down_votes)
    }

    pub fn mirror(&self) -> MirrorRef {
        MirrorRef {
            message_id: self.mirror_message_id,
            thread_id: self.mirror_thread_id,
        }
    }

    pub fn votes(&self) -> VoteTally {
        VoteTally::new(self.up_votes, self.down_votes)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub community_id: CommunityId,
    pub user_id: UserId,
    pub reviewer_id: UserId,
    pub reason: Option<String>,
    pub blocked_at: DateTime<Utc>,
}
