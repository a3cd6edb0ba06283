use crate::cache::{Mutation, SuggestionCache};
use crate::config::RetryPolicy;
use crate::error::EngineError;
use crate::traits::{AuditLogger, MirrorPublisher};
use anyhow::anyhow;
use domain::{AuditEvent, CommunityId, MirrorRef, Suggestion, SuggestionStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Side effects of committed state changes. Mirror requests carry only the
/// key; the worker reads the current record when it gets to them.
#[derive(Debug, Clone)]
pub(crate) enum Outbound {
    Publish { community: CommunityId, id: i64 },
    Update { community: CommunityId, id: i64 },
    Teardown { community: CommunityId, id: i64 },
    Audit { community: CommunityId, event: AuditEvent },
}

/// Non-blocking handle used by the engine to queue side effects.
#[derive(Clone)]
pub(crate) struct Outbox {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Outbox {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn send(&self, request: Outbound) {
        if let Err(e) = self.tx.send(request) {
            error!("Outbound worker is gone, dropping {:?}", e.0);
        }
    }
}

/// Drains the outbox in order, retrying each request with exponential backoff.
pub struct OutboxWorker {
    rx: mpsc::UnboundedReceiver<Outbound>,
    cache: Arc<SuggestionCache>,
    mirror: Arc<dyn MirrorPublisher>,
    audit: Arc<dyn AuditLogger>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl OutboxWorker {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Outbound>,
        cache: Arc<SuggestionCache>,
        mirror: Arc<dyn MirrorPublisher>,
        audit: Arc<dyn AuditLogger>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            rx,
            cache,
            mirror,
            audit,
            policy,
            timeout,
        }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Outbound worker started");
        loop {
            tokio::select! {
                request = self.rx.recv() => {
                    match request {
                        Some(request) => self.process(request, &cancel_token).await,
                        None => break,
                    }
                },
                _ = cancel_token.cancelled() => break,
            }
        }

        let mut dropped = 0usize;
        while let Ok(request) = self.rx.try_recv() {
            warn!("Shutting down with unsent {:?}", request);
            dropped += 1;
        }
        info!(dropped, "Outbound worker stopped");
    }

    async fn process(&self, request: Outbound, cancel: &CancellationToken) {
        match request {
            Outbound::Publish { community, id } => {
                let Some(s) = self.current(community, id).await else { return };
                if s.mirror().is_published() || s.status == SuggestionStatus::Removed {
                    debug!(community = %community, id, "Nothing to publish");
                    return;
                }
                match self.retry("publish", cancel, || self.mirror.publish(&s)).await {
                    Ok(mirror) => self.attach(community, id, mirror).await,
                    Err(e) => give_up("publish", community, id, e),
                }
            }
            Outbound::Update { community, id } => {
                let Some(s) = self.current(community, id).await else { return };
                let mirror = s.mirror();
                if !mirror.is_published() {
                    debug!(community = %community, id, "Suggestion not published, skipping update");
                    return;
                }
                match self.retry("update", cancel, || self.mirror.update(&s, mirror)).await {
                    Ok(next) if next != mirror => self.attach(community, id, next).await,
                    Ok(_) => {}
                    Err(e) => give_up("update", community, id, e),
                }
            }
            Outbound::Teardown { community, id } => {
                let Some(s) = self.current(community, id).await else { return };
                let mirror = s.mirror();
                if !mirror.is_published() {
                    return;
                }
                if let Err(e) = self.retry("teardown", cancel, || self.mirror.teardown(&s, mirror)).await {
                    give_up("teardown", community, id, e);
                }
            }
            Outbound::Audit { community, event } => {
                if let Err(e) = self.retry("audit", cancel, || self.audit.record(community, &event)).await {
                    error!(
                        community = %community,
                        event = event.title(),
                        "Dropping audit record: {}",
                        EngineError::Collaborator(e)
                    );
                }
            }
        }
    }

    async fn current(&self, community: CommunityId, id: i64) -> Option<Suggestion> {
        match self.cache.get_by_id(community, id).await {
            Ok(Some(s)) => Some(s),
            Ok(None) => {
                warn!(community = %community, id, "Suggestion vanished before mirror sync");
                None
            }
            Err(e) => {
                error!(community = %community, id, "Cannot read suggestion for mirror sync: {}", e);
                None
            }
        }
    }

    async fn attach(&self, community: CommunityId, id: i64, mirror: MirrorRef) {
        let result = self
            .cache
            .update(community, id, |s| {
                if s.mirror() == mirror {
                    return Ok(None);
                }
                let mut next = s.clone();
                next.mirror_message_id = mirror.message_id;
                next.mirror_thread_id = mirror.thread_id;
                Ok(Some(next))
            })
            .await;
        match result {
            Ok(Mutation::Changed { .. }) => {
                debug!(community = %community, id, message = mirror.message_id, "Mirror attached")
            }
            Ok(_) => {}
            Err(e) => error!(community = %community, id, "Failed to store mirror reference: {}", e),
        }
    }

    async fn retry<T, F, Fut>(
        &self,
        what: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, op()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow!("timed out after {:?}", self.timeout)),
            };
            let e = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => e,
            };

            let delay = self.policy.backoff(attempt);
            warn!(
                attempt,
                max_attempts,
                "{} failed: {:#}. Retrying in {:?}",
                what,
                e,
                delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = cancel.cancelled() => return Err(e.context("shutdown interrupted retries")),
            }
        }
    }
}

fn give_up(what: &str, community: CommunityId, id: i64, e: anyhow::Error) {
    error!(
        community = %community,
        id,
        "Giving up mirror {}: {}",
        what,
        EngineError::Collaborator(e)
    );
}
