//! In-memory collaborators for engine tests.

use crate::traits::{AuditLogger, MembershipResolver, MirrorPublisher, ReactionSurface, Repository};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use domain::{
    AuditEvent, BlockedUser, CommunityId, MirrorRef, RoleId, Suggestion, UserId, VoteTally,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn suggestion(community: CommunityId, id: i64, author: UserId) -> Suggestion {
    Suggestion::new(
        community,
        id,
        author,
        format!("suggestion {id}"),
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(id),
    )
}

/// Polls `check` until it holds or a second has passed.
pub(crate) async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[derive(Default)]
pub(crate) struct MemoryRepository {
    suggestions: Mutex<Vec<Suggestion>>,
    blocked: Mutex<Vec<BlockedUser>>,
    pub loads: AtomicUsize,
    pub writes: AtomicUsize,
    failing_writes: AtomicBool,
    failing_loads: AtomicBool,
    load_delay_ms: AtomicU64,
    insert_delay_ms: AtomicU64,
}

impl MemoryRepository {
    pub fn with_suggestions(rows: Vec<Suggestion>) -> Self {
        let repo = Self::default();
        *repo.suggestions.lock().unwrap() = rows;
        repo
    }

    pub fn with_blocked(rows: Vec<BlockedUser>) -> Self {
        let repo = Self::default();
        *repo.blocked.lock().unwrap() = rows;
        repo
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.suggestions.lock().unwrap().clone()
    }

    pub fn blocked(&self) -> Vec<BlockedUser> {
        self.blocked.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.failing_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.failing_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_load_delay_ms(&self, ms: u64) {
        self.load_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_insert_delay_ms(&self, ms: u64) {
        self.insert_delay_ms.store(ms, Ordering::SeqCst);
    }

    fn write(&self) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk I/O error"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing_loads.load(Ordering::SeqCst) {
            return Err(anyhow!("database is locked"));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn load_suggestions(&self, community: CommunityId) -> Result<Vec<Suggestion>> {
        self.load().await?;
        let mut rows: Vec<Suggestion> = self
            .suggestions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.community_id == community)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.write()?;
        let mut rows = self.suggestions.lock().unwrap();
        if rows
            .iter()
            .any(|s| s.community_id == suggestion.community_id && s.id == suggestion.id)
        {
            return Err(anyhow!("UNIQUE constraint failed: suggestions.id"));
        }
        rows.push(suggestion.clone());
        Ok(())
    }

    async fn update_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        self.update_suggestions(std::slice::from_ref(suggestion)).await
    }

    async fn update_suggestions(&self, batch: &[Suggestion]) -> Result<()> {
        self.write()?;
        let mut rows = self.suggestions.lock().unwrap();
        for next in batch {
            let row = rows
                .iter_mut()
                .find(|s| s.community_id == next.community_id && s.id == next.id)
                .ok_or_else(|| anyhow!("no suggestion {}", next.id))?;
            *row = next.clone();
        }
        Ok(())
    }

    async fn load_blocked_users(&self, community: CommunityId) -> Result<Vec<BlockedUser>> {
        self.load().await?;
        Ok(self
            .blocked
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.community_id == community)
            .cloned()
            .collect())
    }

    async fn insert_blocked_user(&self, entry: &BlockedUser) -> Result<()> {
        self.write()?;
        let mut rows = self.blocked.lock().unwrap();
        rows.retain(|b| !(b.community_id == entry.community_id && b.user_id == entry.user_id));
        rows.push(entry.clone());
        Ok(())
    }

    async fn delete_blocked_user(&self, community: CommunityId, user_id: UserId) -> Result<bool> {
        self.write()?;
        let mut rows = self.blocked.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| !(b.community_id == community && b.user_id == user_id));
        Ok(rows.len() != before)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MirrorCall {
    Publish(i64),
    Update(i64, MirrorRef),
    Teardown(i64, MirrorRef),
}

/// Hands out message ids from 1000 upward; thread id is message id + 1.
#[derive(Default)]
pub(crate) struct RecordingMirror {
    calls: Mutex<Vec<MirrorCall>>,
    next_message: AtomicU64,
    failures_left: AtomicU32,
    close_threads: AtomicBool,
}

impl RecordingMirror {
    pub fn calls(&self) -> Vec<MirrorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The next `n` calls fail.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// `update` reports the discussion thread as closed.
    pub fn close_threads_on_update(&self) {
        self.close_threads.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: MirrorCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(anyhow!("503 Service Unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl MirrorPublisher for RecordingMirror {
    async fn publish(&self, suggestion: &Suggestion) -> Result<MirrorRef> {
        self.record(MirrorCall::Publish(suggestion.id))?;
        let message_id = 1000 + self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MirrorRef {
            message_id,
            thread_id: message_id + 1,
        })
    }

    async fn update(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<MirrorRef> {
        self.record(MirrorCall::Update(suggestion.id, mirror))?;
        if self.close_threads.load(Ordering::SeqCst) {
            return Ok(MirrorRef {
                thread_id: 0,
                ..mirror
            });
        }
        Ok(mirror)
    }

    async fn teardown(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<()> {
        self.record(MirrorCall::Teardown(suggestion.id, mirror))
    }

    fn link(&self, community: CommunityId, mirror: MirrorRef) -> Option<String> {
        Some(format!("https://chat.example/{community}/{}", mirror.message_id))
    }
}

#[derive(Default)]
pub(crate) struct RecordingAudit {
    events: Mutex<Vec<(CommunityId, AuditEvent)>>,
    failing: AtomicBool,
}

impl RecordingAudit {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditLogger for RecordingAudit {
    async fn record(&self, community: CommunityId, event: &AuditEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("log channel missing"));
        }
        self.events.lock().unwrap().push((community, event.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct StaticMembers {
    pub roles: HashMap<UserId, Vec<RoleId>>,
    pub names: HashMap<UserId, String>,
    pub unavailable: bool,
}

#[async_trait]
impl MembershipResolver for StaticMembers {
    async fn roles(&self, _community: CommunityId, user_id: UserId) -> Result<Vec<RoleId>> {
        if self.unavailable {
            return Err(anyhow!("member lookup failed"));
        }
        Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn display_name(&self, _community: CommunityId, user_id: UserId) -> Result<Option<String>> {
        if self.unavailable {
            return Err(anyhow!("member lookup failed"));
        }
        Ok(self.names.get(&user_id).cloned())
    }
}

/// Reaction counts keyed by mirror message id; unknown ids fail.
#[derive(Default)]
pub(crate) struct FixedSurface {
    counts: Mutex<HashMap<u64, VoteTally>>,
    pub calls: AtomicUsize,
}

impl FixedSurface {
    pub fn set(&self, mirror_message_id: u64, tally: VoteTally) {
        self.counts.lock().unwrap().insert(mirror_message_id, tally);
    }
}

#[async_trait]
impl ReactionSurface for FixedSurface {
    async fn reaction_counts(
        &self,
        _suggestion: &Suggestion,
        mirror: MirrorRef,
    ) -> Result<Option<VoteTally>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.counts
            .lock()
            .unwrap()
            .get(&mirror.message_id)
            .copied()
            .map(Some)
            .ok_or_else(|| anyhow!("message {} not reachable", mirror.message_id))
    }
}
