mod blocklist;
mod cache;
pub mod config;
mod cooldown;
mod engine;
mod error;
mod lifecycle;
mod outbox;
mod partition;
mod repository;
mod stats;
pub mod traits;
mod votes;

#[cfg(test)]
mod testutil;

pub use blocklist::BlockList;
pub use cache::SuggestionCache;
pub use config::{CommunitySettings, EngineConfig, RetryPolicy};
pub use cooldown::remaining_cooldown;
pub use engine::{AuthorRef, Collaborators, Engine};
pub use error::{EngineError, Result};
pub use lifecycle::Actor;
pub use outbox::OutboxWorker;
pub use stats::{Contributor, SuggestionStats};
pub use traits::{AuditLogger, MembershipResolver, MirrorPublisher, ReactionSurface, Repository};
