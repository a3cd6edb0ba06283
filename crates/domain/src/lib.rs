mod events;
mod models;
pub mod protocol;

pub use events::{AuditEvent, ReactionAction, ReactionEvent};
pub use models::{
    BlockedUser, CommunityId, MirrorRef, ParseStatusError, RoleId, Suggestion, SuggestionStatus,
    UserId, VoteTally,
};
pub use protocol::VoteKind;
