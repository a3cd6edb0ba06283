use anyhow::Result;
use async_trait::async_trait;
use domain::{AuditEvent, CommunityId, MirrorRef, Suggestion, VoteTally};
use engine::{AuditLogger, MirrorPublisher, ReactionSurface};
use tracing::{debug, info};

/// Writes audit records to the `audit` tracing target. Used when no chat
/// bridge is configured.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLogger for TracingAuditLog {
    async fn record(&self, community: CommunityId, event: &AuditEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(target: "audit", community = %community, event = event.title(), "{}", payload);
        Ok(())
    }
}

/// Stand-in for a missing chat bridge. Suggestions stay unpublished and
/// there are no reactions to read.
#[derive(Debug, Clone, Default)]
pub struct DetachedMirror;

#[async_trait]
impl MirrorPublisher for DetachedMirror {
    async fn publish(&self, suggestion: &Suggestion) -> Result<MirrorRef> {
        debug!(id = suggestion.id, "No bridge configured, suggestion stays local");
        Ok(MirrorRef::default())
    }

    async fn update(&self, _suggestion: &Suggestion, mirror: MirrorRef) -> Result<MirrorRef> {
        Ok(mirror)
    }

    async fn teardown(&self, _suggestion: &Suggestion, _mirror: MirrorRef) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ReactionSurface for DetachedMirror {
    async fn reaction_counts(
        &self,
        _suggestion: &Suggestion,
        _mirror: MirrorRef,
    ) -> Result<Option<VoteTally>> {
        Ok(None)
    }
}
