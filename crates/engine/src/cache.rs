use crate::error::{EngineError, Result};
use crate::partition::{PartitionMap, Slot};
use crate::traits::Repository;
use chrono::{DateTime, Utc};
use domain::{CommunityId, Suggestion, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Outcome of a serialised read-modify-write on one record.
#[derive(Debug)]
pub(crate) enum Mutation {
    Missing,
    Unchanged,
    Changed { before: Suggestion, after: Suggestion },
}

/// Per-community in-memory view of the suggestion table, written through to
/// the repository. Rows keep their insertion order.
pub struct SuggestionCache {
    repo: Arc<dyn Repository>,
    partitions: PartitionMap<Vec<Suggestion>>,
}

impl SuggestionCache {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            partitions: PartitionMap::new(),
        }
    }

    async fn rows<'a>(&self, slot: &'a Slot<Vec<Suggestion>>) -> Result<&'a RwLock<Vec<Suggestion>>> {
        slot.data(|community| async move {
            let rows = self
                .repo
                .load_suggestions(community)
                .await
                .map_err(EngineError::Persistence)?;
            info!(community = %community, count = rows.len(), "Loaded suggestions");
            Ok(rows)
        })
        .await
    }

    async fn read<T>(
        &self,
        community: CommunityId,
        f: impl FnOnce(&[Suggestion]) -> T,
    ) -> Result<T> {
        let slot = self.partitions.slot(community).await;
        let rows = self.rows(&slot).await?;
        let guard = rows.read().await;
        Ok(f(&guard))
    }

    pub async fn ensure_loaded(&self, community: CommunityId) -> Result<()> {
        let slot = self.partitions.slot(community).await;
        self.rows(&slot).await?;
        Ok(())
    }

    /// Assigns the next id, persists the record, then makes it visible.
    pub async fn create(
        &self,
        community: CommunityId,
        author_id: UserId,
        content: String,
    ) -> Result<Suggestion> {
        self.create_gated(community, author_id, content, |_| Ok(()))
            .await
    }

    /// Like `create`, but `gate` first sees the author's latest submission
    /// under the community's writer lock and may refuse the insert.
    pub(crate) async fn create_gated<G>(
        &self,
        community: CommunityId,
        author_id: UserId,
        content: String,
        gate: G,
    ) -> Result<Suggestion>
    where
        G: FnOnce(Option<DateTime<Utc>>) -> Result<()>,
    {
        let slot = self.partitions.slot(community).await;
        let rows = self.rows(&slot).await?;
        let _writer = slot.writer.lock().await;

        let (id, last) = {
            let guard = rows.read().await;
            (next_id(&guard), latest_by(&guard, author_id))
        };
        gate(last)?;

        let suggestion = Suggestion::new(community, id, author_id, content, Utc::now());
        self.repo
            .insert_suggestion(&suggestion)
            .await
            .map_err(EngineError::Persistence)?;
        rows.write().await.push(suggestion.clone());

        info!(community = %community, id, author = author_id, "Created suggestion");
        Ok(suggestion)
    }

    pub async fn get_by_id(&self, community: CommunityId, id: i64) -> Result<Option<Suggestion>> {
        self.read(community, |rows| rows.iter().find(|s| s.id == id).cloned())
            .await
    }

    pub async fn get_by_mirror_message_id(
        &self,
        community: CommunityId,
        mirror_message_id: u64,
    ) -> Result<Option<Suggestion>> {
        if mirror_message_id == 0 {
            return Ok(None);
        }
        self.read(community, |rows| {
            rows.iter()
                .find(|s| s.mirror_message_id == mirror_message_id)
                .cloned()
        })
        .await
    }

    pub async fn list(&self, community: CommunityId, open_only: bool) -> Result<Vec<Suggestion>> {
        self.read(community, |rows| {
            rows.iter()
                .filter(|s| !open_only || s.is_open())
                .cloned()
                .collect()
        })
        .await
    }

    pub async fn list_by_author(
        &self,
        community: CommunityId,
        author_id: UserId,
    ) -> Result<Vec<Suggestion>> {
        self.read(community, |rows| {
            rows.iter()
                .filter(|s| s.author_id == author_id)
                .cloned()
                .collect()
        })
        .await
    }

    /// Open suggestions by descending score; equal scores keep insertion order.
    pub async fn top_by_score(&self, community: CommunityId, count: usize) -> Result<Vec<Suggestion>> {
        let mut open = self.list(community, true).await?;
        open.sort_by(|a, b| b.score().cmp(&a.score()));
        open.truncate(count);
        Ok(open)
    }

    pub async fn last_submission(
        &self,
        community: CommunityId,
        author_id: UserId,
    ) -> Result<Option<DateTime<Utc>>> {
        self.read(community, |rows| latest_by(rows, author_id))
            .await
    }

    /// Applies `apply` to the first record matching `matches` under the
    /// community's writer lock. `apply` returning `Ok(None)` means no change.
    /// The repository write completes before the new value is visible.
    pub(crate) async fn update_where<P, F>(
        &self,
        community: CommunityId,
        matches: P,
        apply: F,
    ) -> Result<Mutation>
    where
        P: Fn(&Suggestion) -> bool,
        F: FnOnce(&Suggestion) -> Result<Option<Suggestion>>,
    {
        let slot = self.partitions.slot(community).await;
        let rows = self.rows(&slot).await?;
        let _writer = slot.writer.lock().await;

        let (index, current) = {
            let guard = rows.read().await;
            match guard.iter().position(|s| matches(s)) {
                Some(index) => (index, guard[index].clone()),
                None => return Ok(Mutation::Missing),
            }
        };

        let next = match apply(&current)? {
            Some(next) if next != current => next,
            _ => return Ok(Mutation::Unchanged),
        };
        debug_assert_eq!((next.community_id, next.id), (current.community_id, current.id));

        self.repo
            .update_suggestion(&next)
            .await
            .map_err(EngineError::Persistence)?;
        rows.write().await[index] = next.clone();

        Ok(Mutation::Changed {
            before: current,
            after: next,
        })
    }

    pub(crate) async fn update<F>(&self, community: CommunityId, id: i64, apply: F) -> Result<Mutation>
    where
        F: FnOnce(&Suggestion) -> Result<Option<Suggestion>>,
    {
        self.update_where(community, |s| s.id == id, apply).await
    }

    /// Like `update_where` for many records at once, persisted as one batch.
    pub(crate) async fn update_batch<F>(
        &self,
        community: CommunityId,
        mut apply: F,
    ) -> Result<Vec<Suggestion>>
    where
        F: FnMut(&Suggestion) -> Option<Suggestion>,
    {
        let slot = self.partitions.slot(community).await;
        let rows = self.rows(&slot).await?;
        let _writer = slot.writer.lock().await;

        let changed: Vec<(usize, Suggestion)> = {
            let guard = rows.read().await;
            guard
                .iter()
                .enumerate()
                .filter_map(|(index, s)| apply(s).filter(|next| next != s).map(|next| (index, next)))
                .collect()
        };
        if changed.is_empty() {
            return Ok(Vec::new());
        }

        let batch: Vec<Suggestion> = changed.iter().map(|(_, s)| s.clone()).collect();
        self.repo
            .update_suggestions(&batch)
            .await
            .map_err(EngineError::Persistence)?;

        let mut guard = rows.write().await;
        for (index, next) in changed {
            guard[index] = next;
        }
        Ok(batch)
    }
}

fn latest_by(rows: &[Suggestion], author_id: UserId) -> Option<DateTime<Utc>> {
    rows.iter()
        .filter(|s| s.author_id == author_id)
        .map(|s| s.created_at)
        .max()
}

/// Lowest id not yet taken, starting at 1. With no imported ids this is the
/// maximum plus one; ids seeded out of band are stepped over.
pub(crate) fn next_id(rows: &[Suggestion]) -> i64 {
    let taken: HashSet<i64> = rows.iter().map(|s| s.id).collect();
    let mut next = 1;
    while taken.contains(&next) {
        next += 1;
    }
    next
}
