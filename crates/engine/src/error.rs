use domain::{ParseStatusError, UserId};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown suggestion or mirror reference.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("user {0} is blocked from submitting suggestions")]
    Blocked(UserId),

    #[error("submission cooldown active, {}s remaining", remaining.as_secs())]
    CooldownActive { remaining: Duration },

    /// The repository call failed; in-memory state was left untouched.
    #[error("persistence failure: {0:#}")]
    Persistence(#[source] anyhow::Error),

    /// Mirror, audit or membership call failed. Logged, never returned from a state change.
    #[error("collaborator failure: {0:#}")]
    Collaborator(#[source] anyhow::Error),
}

impl From<ParseStatusError> for EngineError {
    fn from(e: ParseStatusError) -> Self {
        EngineError::InvalidArgument(e.to_string())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
