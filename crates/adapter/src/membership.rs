use anyhow::Result;
use async_trait::async_trait;
use domain::{CommunityId, RoleId, UserId};
use engine::MembershipResolver;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

/// Member table loaded from configuration, keyed by user id in decimal.
/// Applies to every community.
#[derive(Debug, Clone, Default)]
pub struct StaticMembership {
    members: HashMap<UserId, MemberEntry>,
}

impl StaticMembership {
    pub fn new(members: HashMap<UserId, MemberEntry>) -> Self {
        Self { members }
    }

    /// Accepts the string keys configuration files produce; keys that are
    /// not user ids are an error.
    pub fn from_config(raw: HashMap<String, MemberEntry>) -> Result<Self> {
        let mut members = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let user_id: UserId = key
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("membership key is not a user id: {}", key))?;
            members.insert(user_id, entry);
        }
        Ok(Self::new(members))
    }
}

#[async_trait]
impl MembershipResolver for StaticMembership {
    async fn roles(&self, _community: CommunityId, user_id: UserId) -> Result<Vec<RoleId>> {
        Ok(self
            .members
            .get(&user_id)
            .map(|m| m.roles.clone())
            .unwrap_or_default())
    }

    async fn display_name(&self, _community: CommunityId, user_id: UserId) -> Result<Option<String>> {
        Ok(self.members.get(&user_id).and_then(|m| m.name.clone()))
    }
}
