use crate::blocklist::BlockList;
use crate::cache::SuggestionCache;
use crate::config::EngineConfig;
use crate::cooldown::remaining_cooldown;
use crate::error::{EngineError, Result};
use crate::outbox::{Outbound, Outbox, OutboxWorker};
use crate::stats::SuggestionStats;
use crate::traits::{AuditLogger, MembershipResolver, MirrorPublisher, ReactionSurface, Repository};
use chrono::Utc;
use domain::{CommunityId, Suggestion, UserId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The out-of-core services the engine calls back into.
#[derive(Clone)]
pub struct Collaborators {
    pub mirror: Arc<dyn MirrorPublisher>,
    pub audit: Arc<dyn AuditLogger>,
    pub membership: Arc<dyn MembershipResolver>,
}

/// Display identity of a suggestion author. Falls back to the bare id when
/// the member cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

impl fmt::Display for AuthorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.user_id),
        }
    }
}

/// Suggestion lifecycle and consistency engine.
///
/// Cheap to clone; all clones share the same caches and outbound queue.
#[derive(Clone)]
pub struct Engine {
    pub(crate) cache: Arc<SuggestionCache>,
    pub(crate) blocks: Arc<BlockList>,
    pub(crate) mirror: Arc<dyn MirrorPublisher>,
    pub(crate) membership: Arc<dyn MembershipResolver>,
    pub(crate) outbox: Outbox,
    pub(crate) config: Arc<EngineConfig>,
}

impl Engine {
    /// Builds the engine and the worker that performs its side effects.
    /// The caller spawns `OutboxWorker::run`.
    pub fn new(
        repo: Arc<dyn Repository>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> (Self, OutboxWorker) {
        let cache = Arc::new(SuggestionCache::new(repo.clone()));
        let (outbox, rx) = Outbox::channel();
        let worker = OutboxWorker::new(
            rx,
            cache.clone(),
            collaborators.mirror.clone(),
            collaborators.audit,
            config.retry.clone(),
            config.collaborator_timeout(),
        );
        let engine = Self {
            cache,
            blocks: Arc::new(BlockList::new(repo)),
            mirror: collaborators.mirror,
            membership: collaborators.membership,
            outbox,
            config: Arc::new(config),
        };
        (engine, worker)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn ensure_loaded(&self, community: CommunityId) -> Result<()> {
        self.cache.ensure_loaded(community).await?;
        self.blocks.ensure_loaded(community).await
    }

    /// Hydrates the community and imports reaction counts for suggestions
    /// that have not seen a vote yet.
    pub async fn community_available(
        &self,
        community: CommunityId,
        surface: &dyn ReactionSurface,
    ) -> Result<usize> {
        self.ensure_loaded(community).await?;
        self.reconcile_baseline(community, surface).await
    }

    /// Validates and gates a submission, stores it and queues its publication.
    pub async fn create_suggestion(
        &self,
        community: CommunityId,
        author_id: UserId,
        content: &str,
    ) -> Result<Suggestion> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::InvalidArgument(
                "suggestion content is empty".into(),
            ));
        }
        let max = self.config.max_content_length;
        if content.chars().count() > max {
            return Err(EngineError::InvalidArgument(format!(
                "suggestion content exceeds {} characters",
                max
            )));
        }

        if self.is_blocked(community, author_id).await? {
            return Err(EngineError::Blocked(author_id));
        }

        // roles are resolved up front; the gate itself runs under the writer lock
        let settings = self.config.community(community);
        let roles = if settings.cooldown_seconds > 0 {
            self.cooldown_roles(community, author_id).await
        } else {
            Vec::new()
        };
        let suggestion = self
            .cache
            .create_gated(community, author_id, content.to_string(), |last| {
                let remaining = remaining_cooldown(last, &roles, settings, Utc::now());
                if remaining.is_zero() {
                    Ok(())
                } else {
                    Err(EngineError::CooldownActive { remaining })
                }
            })
            .await?;
        self.outbox.send(Outbound::Publish {
            community,
            id: suggestion.id,
        });
        Ok(suggestion)
    }

    pub async fn get_by_id(&self, community: CommunityId, id: i64) -> Result<Option<Suggestion>> {
        self.cache.get_by_id(community, id).await
    }

    pub async fn get_by_mirror_id(
        &self,
        community: CommunityId,
        mirror_message_id: u64,
    ) -> Result<Option<Suggestion>> {
        self.cache
            .get_by_mirror_message_id(community, mirror_message_id)
            .await
    }

    pub async fn list_suggestions(
        &self,
        community: CommunityId,
        open_only: bool,
    ) -> Result<Vec<Suggestion>> {
        self.cache.list(community, open_only).await
    }

    pub async fn list_by_author(
        &self,
        community: CommunityId,
        author_id: UserId,
    ) -> Result<Vec<Suggestion>> {
        self.cache.list_by_author(community, author_id).await
    }

    /// `count` defaults to the configured `top_count`.
    pub async fn top_suggestions(
        &self,
        community: CommunityId,
        count: Option<usize>,
    ) -> Result<Vec<Suggestion>> {
        let count = count.unwrap_or(self.config.top_count);
        self.cache.top_by_score(community, count).await
    }

    pub async fn stats(&self, community: CommunityId) -> Result<SuggestionStats> {
        let all = self.cache.list(community, false).await?;
        Ok(SuggestionStats::from_suggestions(&all))
    }

    pub async fn author(&self, community: CommunityId, user_id: UserId) -> AuthorRef {
        let display_name = match self.membership.display_name(community, user_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(
                    community = %community,
                    user = user_id,
                    "Cannot resolve author: {}",
                    EngineError::Collaborator(e)
                );
                None
            }
        };
        AuthorRef {
            user_id,
            display_name,
        }
    }

    pub(crate) fn audit(&self, community: CommunityId, event: domain::AuditEvent) {
        info!(community = %community, event = event.title(), "Audit");
        self.outbox.send(Outbound::Audit { community, event });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{CommunitySettings, RetryPolicy};
    use crate::testutil::{
        eventually, MemoryRepository, MirrorCall, RecordingAudit, RecordingMirror, StaticMembers,
    };
    use tokio_util::sync::CancellationToken;

    pub(crate) struct Harness {
        pub engine: Engine,
        pub repo: Arc<MemoryRepository>,
        pub mirror: Arc<RecordingMirror>,
        pub audit: Arc<RecordingAudit>,
        pub cancel: CancellationToken,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.cancel.cancel();
        }
    }

    pub(crate) fn config(cooldown_seconds: i64) -> EngineConfig {
        EngineConfig {
            defaults: CommunitySettings {
                cooldown_seconds,
                cooldown_exempt_roles: vec![77],
            },
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff_ms: 1,
                max_backoff_ms: 4,
            },
            collaborator_timeout_ms: 500,
            ..EngineConfig::default()
        }
    }

    pub(crate) fn harness_with(
        repo: MemoryRepository,
        members: StaticMembers,
        config: EngineConfig,
    ) -> Harness {
        let repo = Arc::new(repo);
        let mirror = Arc::new(RecordingMirror::default());
        let audit = Arc::new(RecordingAudit::default());
        let (engine, worker) = Engine::new(
            repo.clone(),
            Collaborators {
                mirror: mirror.clone(),
                audit: audit.clone(),
                membership: Arc::new(members),
            },
            config,
        );
        let cancel = CancellationToken::new();
        tokio::spawn(worker.run(cancel.clone()));
        Harness {
            engine,
            repo,
            mirror,
            audit,
            cancel,
        }
    }

    pub(crate) fn harness() -> Harness {
        harness_with(MemoryRepository::default(), StaticMembers::default(), config(0))
    }

    const C: CommunityId = CommunityId::new(1);

    #[tokio::test]
    async fn create_validates_content() {
        let h = harness();
        let err = h.engine.create_suggestion(C, 1, "   ").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let long = "x".repeat(4001);
        let err = h.engine.create_suggestion(C, 1, &long).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let s = h.engine.create_suggestion(C, 1, "  add a bot channel  ").await.unwrap();
        assert_eq!(s.content, "add a bot channel");
        assert_eq!(s.id, 1);
    }

    #[tokio::test]
    async fn create_publishes_and_binds_mirror() {
        let h = harness();
        let s = h.engine.create_suggestion(C, 1, "polls").await.unwrap();

        let engine = &h.engine;
        assert!(
            eventually(|| h.repo.suggestions()[0].mirror_message_id == 1000).await,
            "mirror reference was not persisted"
        );
        let cached = engine.get_by_id(C, s.id).await.unwrap().unwrap();
        assert_eq!(cached.mirror_message_id, 1000);
        assert_eq!(cached.mirror_thread_id, 1001);
        assert_eq!(
            engine.get_by_mirror_id(C, 1000).await.unwrap().map(|s| s.id),
            Some(s.id)
        );
        assert_eq!(h.mirror.calls(), vec![MirrorCall::Publish(s.id)]);
    }

    #[tokio::test]
    async fn publish_is_retried_then_succeeds() {
        let h = harness();
        h.mirror.fail_next(2);
        h.engine.create_suggestion(C, 1, "retry me").await.unwrap();

        assert!(eventually(|| h.repo.suggestions()[0].mirror_message_id != 0).await);
        assert_eq!(h.mirror.calls().len(), 3);
    }

    #[tokio::test]
    async fn permanent_mirror_failure_keeps_the_suggestion() {
        let h = harness();
        h.mirror.fail_next(10);
        let s = h.engine.create_suggestion(C, 1, "unlucky").await.unwrap();

        assert!(eventually(|| h.mirror.calls().len() == 3).await);
        let cached = h.engine.get_by_id(C, s.id).await.unwrap().unwrap();
        assert!(!cached.mirror().is_published());
        assert_eq!(h.repo.suggestions().len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_propagated() {
        let h = harness();
        h.repo.fail_writes(true);
        let err = h.engine.create_suggestion(C, 1, "lost").await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        assert!(h.engine.list_suggestions(C, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn author_falls_back_to_bare_id() {
        let mut members = StaticMembers::default();
        members.names.insert(5, "Ada".into());
        let h = harness_with(MemoryRepository::default(), members, config(0));

        assert_eq!(h.engine.author(C, 5).await.to_string(), "Ada");
        let gone = h.engine.author(C, 6).await;
        assert_eq!(gone.display_name, None);
        assert_eq!(gone.to_string(), "6");

        let offline = harness_with(
            MemoryRepository::default(),
            StaticMembers {
                unavailable: true,
                ..StaticMembers::default()
            },
            config(0),
        );
        assert_eq!(offline.engine.author(C, 5).await.to_string(), "5");
    }

    #[tokio::test]
    async fn state_survives_restart_on_sqlite() {
        let db = storage::Db::in_memory().await.unwrap();
        let collaborators = || Collaborators {
            mirror: Arc::new(RecordingMirror::default()),
            audit: Arc::new(RecordingAudit::default()),
            membership: Arc::new(StaticMembers::default()),
        };

        let (engine, _worker) = Engine::new(Arc::new(db.clone()), collaborators(), config(0));
        engine.create_suggestion(C, 1, "first").await.unwrap();
        engine.create_suggestion(C, 2, "second").await.unwrap();
        engine.block(C, 3, 9, Some("spam")).await.unwrap();
        engine
            .set_status(C, 2, domain::SuggestionStatus::Accepted, crate::Actor::Reviewer(9), None)
            .await
            .unwrap();

        let (restarted, _worker) = Engine::new(Arc::new(db), collaborators(), config(0));
        let all = restarted.list_suggestions(C, false).await.unwrap();
        assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(all[1].status, domain::SuggestionStatus::Accepted);
        assert_eq!(all[1].reviewer_id, Some(9));
        assert!(restarted.is_blocked(C, 3).await.unwrap());
        assert_eq!(restarted.create_suggestion(C, 4, "third").await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn top_suggestions_uses_configured_default_count() {
        let mut cfg = config(0);
        cfg.top_count = 2;
        let h = harness_with(MemoryRepository::default(), StaticMembers::default(), cfg);
        for i in 0..3 {
            h.engine.create_suggestion(C, i, "idea").await.unwrap();
        }
        assert_eq!(h.engine.top_suggestions(C, None).await.unwrap().len(), 2);
        assert_eq!(h.engine.top_suggestions(C, Some(5)).await.unwrap().len(), 3);
    }
}
