use crate::models::{CommunityId, SuggestionStatus, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Removed,
}

impl ReactionAction {
    pub fn delta(&self) -> i32 {
        match self {
            ReactionAction::Added => 1,
            ReactionAction::Removed => -1,
        }
    }
}

/// A reaction added to or removed from a mirrored suggestion message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub community_id: CommunityId,
    pub mirror_message_id: u64,
    pub user_id: UserId,
    pub emoji: String,
    pub action: ReactionAction,
    #[serde(default)]
    pub is_bot: bool,
}

/// Staff-visible audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    StatusChanged {
        suggestion_id: i64,
        old_status: SuggestionStatus,
        new_status: SuggestionStatus,
        reviewer_id: Option<UserId>,
        remarks: Option<String>,
        link: Option<String>,
    },
    UserBlocked {
        user_id: UserId,
        reviewer_id: UserId,
        reason: Option<String>,
    },
    UserUnblocked {
        user_id: UserId,
        reviewer_id: UserId,
    },
}

impl AuditEvent {
    pub fn title(&self) -> &'static str {
        match self {
            AuditEvent::StatusChanged { .. } => "Suggestion Status Updated",
            AuditEvent::UserBlocked { .. } => "User Blocked",
            AuditEvent::UserUnblocked { .. } => "User Unblocked",
        }
    }
}
