use domain::{CommunityId, RoleId};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct CommunitySettings {
    /// Zero or negative disables the submission cooldown.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
    #[serde(default)]
    pub cooldown_exempt_roles: Vec<RoleId>,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            cooldown_exempt_roles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub defaults: CommunitySettings,
    /// Per-community overrides keyed by the community id in decimal.
    #[serde(default)]
    pub communities: HashMap<String, CommunitySettings>,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_top_count")]
    pub top_count: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: CommunitySettings::default(),
            communities: HashMap::new(),
            max_content_length: default_max_content_length(),
            top_count: default_top_count(),
            retry: RetryPolicy::default(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn community(&self, community: CommunityId) -> &CommunitySettings {
        self.communities
            .get(&community.to_string())
            .unwrap_or(&self.defaults)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

fn default_cooldown_seconds() -> i64 {
    3600
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_max_content_length() -> usize {
    4000
}

fn default_top_count() -> usize {
    10
}

fn default_collaborator_timeout_ms() -> u64 {
    10_000
}
