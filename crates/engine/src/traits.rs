use anyhow::Result;
use async_trait::async_trait;
use domain::{
    AuditEvent, BlockedUser, CommunityId, MirrorRef, RoleId, Suggestion, UserId, VoteTally,
};

/// Durable store for suggestions and block entries. Source of truth across restarts.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_suggestions(&self, community: CommunityId) -> Result<Vec<Suggestion>>;
    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()>;
    async fn update_suggestion(&self, suggestion: &Suggestion) -> Result<()>;
    async fn update_suggestions(&self, batch: &[Suggestion]) -> Result<()>;
    async fn load_blocked_users(&self, community: CommunityId) -> Result<Vec<BlockedUser>>;
    async fn insert_blocked_user(&self, entry: &BlockedUser) -> Result<()>;
    async fn delete_blocked_user(&self, community: CommunityId, user_id: UserId) -> Result<bool>;
}

/// Posts, edits and deletes the external representation of a suggestion.
#[async_trait]
pub trait MirrorPublisher: Send + Sync {
    async fn publish(&self, suggestion: &Suggestion) -> Result<MirrorRef>;

    /// Returns the reference after the edit; the thread id is zeroed when the
    /// discussion thread was closed.
    async fn update(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<MirrorRef>;

    async fn teardown(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<()>;

    fn link(&self, _community: CommunityId, _mirror: MirrorRef) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record(&self, community: CommunityId, event: &AuditEvent) -> Result<()>;
}

#[async_trait]
pub trait MembershipResolver: Send + Sync {
    async fn roles(&self, community: CommunityId, user_id: UserId) -> Result<Vec<RoleId>>;

    /// `Ok(None)` when the user is unknown, e.g. has left the community.
    async fn display_name(&self, community: CommunityId, user_id: UserId) -> Result<Option<String>>;
}

/// Authoritative reaction counts on a published suggestion.
#[async_trait]
pub trait ReactionSurface: Send + Sync {
    /// `Ok(None)` when the mirror message no longer exists.
    async fn reaction_counts(&self, suggestion: &Suggestion, mirror: MirrorRef)
        -> Result<Option<VoteTally>>;
}
