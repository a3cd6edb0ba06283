use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::partition::{PartitionMap, Slot};
use crate::traits::Repository;
use chrono::Utc;
use domain::{AuditEvent, BlockedUser, CommunityId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Per-community set of users barred from submitting. Reads never touch the
/// repository once a community is hydrated.
pub struct BlockList {
    repo: Arc<dyn Repository>,
    partitions: PartitionMap<HashSet<UserId>>,
}

impl BlockList {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            partitions: PartitionMap::new(),
        }
    }

    async fn users<'a>(&self, slot: &'a Slot<HashSet<UserId>>) -> Result<&'a RwLock<HashSet<UserId>>> {
        slot.data(|community| async move {
            let rows = self
                .repo
                .load_blocked_users(community)
                .await
                .map_err(EngineError::Persistence)?;
            info!(community = %community, count = rows.len(), "Loaded block list");
            Ok(rows.into_iter().map(|b| b.user_id).collect())
        })
        .await
    }

    pub async fn ensure_loaded(&self, community: CommunityId) -> Result<()> {
        let slot = self.partitions.slot(community).await;
        self.users(&slot).await?;
        Ok(())
    }

    pub async fn is_blocked(&self, community: CommunityId, user_id: UserId) -> Result<bool> {
        let slot = self.partitions.slot(community).await;
        let users = self.users(&slot).await?;
        let blocked = users.read().await.contains(&user_id);
        Ok(blocked)
    }

    /// Returns `true` when the user was not blocked before. The entry is
    /// visible to readers immediately and withdrawn if the write fails.
    pub async fn block(&self, entry: BlockedUser) -> Result<bool> {
        let community = entry.community_id;
        let slot = self.partitions.slot(community).await;
        let users = self.users(&slot).await?;
        let _writer = slot.writer.lock().await;

        let inserted = users.write().await.insert(entry.user_id);
        if let Err(e) = self.repo.insert_blocked_user(&entry).await {
            if inserted {
                users.write().await.remove(&entry.user_id);
            }
            return Err(EngineError::Persistence(e));
        }
        Ok(inserted)
    }

    /// Returns `true` when an entry existed in memory or in the repository.
    pub async fn unblock(&self, community: CommunityId, user_id: UserId) -> Result<bool> {
        let slot = self.partitions.slot(community).await;
        let users = self.users(&slot).await?;
        let _writer = slot.writer.lock().await;

        let row_removed = self
            .repo
            .delete_blocked_user(community, user_id)
            .await
            .map_err(EngineError::Persistence)?;
        let removed = users.write().await.remove(&user_id);
        Ok(removed || row_removed)
    }
}

impl Engine {
    pub async fn is_blocked(&self, community: CommunityId, user_id: UserId) -> Result<bool> {
        self.blocks.is_blocked(community, user_id).await
    }

    /// Bars `user_id` from submitting. Blocking an already blocked user
    /// refreshes the stored reason without a second audit record.
    pub async fn block(
        &self,
        community: CommunityId,
        user_id: UserId,
        reviewer_id: UserId,
        reason: Option<&str>,
    ) -> Result<bool> {
        if reviewer_id == 0 {
            return Err(EngineError::InvalidArgument(
                "a reviewer is required to block a user".into(),
            ));
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let entry = BlockedUser {
            community_id: community,
            user_id,
            reviewer_id,
            reason: reason.clone(),
            blocked_at: Utc::now(),
        };

        let newly_blocked = self.blocks.block(entry).await?;
        if newly_blocked {
            info!(community = %community, user = user_id, reviewer = reviewer_id, "User blocked");
            self.audit(
                community,
                AuditEvent::UserBlocked {
                    user_id,
                    reviewer_id,
                    reason,
                },
            );
        }
        Ok(newly_blocked)
    }

    pub async fn unblock(
        &self,
        community: CommunityId,
        user_id: UserId,
        reviewer_id: UserId,
    ) -> Result<bool> {
        if reviewer_id == 0 {
            return Err(EngineError::InvalidArgument(
                "a reviewer is required to unblock a user".into(),
            ));
        }
        let removed = self.blocks.unblock(community, user_id).await?;
        if removed {
            info!(community = %community, user = user_id, reviewer = reviewer_id, "User unblocked");
            self.audit(
                community,
                AuditEvent::UserUnblocked {
                    user_id,
                    reviewer_id,
                },
            );
        }
        Ok(removed)
    }
}
