use crate::config::CommunitySettings;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use domain::{CommunityId, RoleId, UserId};
use std::time::Duration;
use tracing::warn;

/// Time left before a member may submit again. Zero when the gate is
/// disabled, the member holds an exempt role, or has never submitted.
pub fn remaining_cooldown(
    last_submission: Option<DateTime<Utc>>,
    roles: &[RoleId],
    settings: &CommunitySettings,
    now: DateTime<Utc>,
) -> Duration {
    if settings.cooldown_seconds <= 0 {
        return Duration::ZERO;
    }
    if roles
        .iter()
        .any(|role| settings.cooldown_exempt_roles.contains(role))
    {
        return Duration::ZERO;
    }
    let Some(last) = last_submission else {
        return Duration::ZERO;
    };

    // a window too large for the calendar never elapses
    let ready_at = chrono::Duration::try_seconds(settings.cooldown_seconds)
        .and_then(|window| last.checked_add_signed(window));
    match ready_at {
        Some(ready_at) => (ready_at - now).to_std().unwrap_or(Duration::ZERO),
        None => Duration::MAX,
    }
}

impl Engine {
    pub async fn remaining_cooldown(&self, community: CommunityId, user_id: UserId) -> Result<Duration> {
        self.remaining_cooldown_at(community, user_id, Utc::now()).await
    }

    pub(crate) async fn remaining_cooldown_at(
        &self,
        community: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Duration> {
        let settings = self.config.community(community);
        if settings.cooldown_seconds <= 0 {
            return Ok(Duration::ZERO);
        }

        let last = self.cache.last_submission(community, user_id).await?;
        if last.is_none() {
            return Ok(Duration::ZERO);
        }
        let roles = self.cooldown_roles(community, user_id).await;
        Ok(remaining_cooldown(last, &roles, settings, now))
    }

    /// Roles checked against the exempt list. A failed lookup exempts nobody.
    pub(crate) async fn cooldown_roles(&self, community: CommunityId, user_id: UserId) -> Vec<RoleId> {
        match self.membership.roles(community, user_id).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(
                    community = %community,
                    user = user_id,
                    "Cannot resolve roles, applying cooldown without exemptions: {}",
                    EngineError::Collaborator(e)
                );
                Vec::new()
            }
        }
    }
}
