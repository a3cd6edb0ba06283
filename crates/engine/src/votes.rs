use crate::cache::Mutation;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::traits::ReactionSurface;
use domain::{CommunityId, ReactionEvent, Suggestion, VoteKind, VoteTally};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Counter adjustment for one reaction. Closed suggestions keep their tally;
/// removals saturate at zero.
pub(crate) fn apply_vote(current: &Suggestion, kind: VoteKind, delta: i32) -> Option<Suggestion> {
    if !current.is_open() {
        return None;
    }
    let mut next = current.clone();
    let counter = match kind {
        VoteKind::Up => &mut next.up_votes,
        VoteKind::Down => &mut next.down_votes,
    };
    *counter = if delta >= 0 {
        counter.saturating_add(delta.unsigned_abs())
    } else {
        counter.saturating_sub(delta.unsigned_abs())
    };
    Some(next)
}

/// Whether a record still qualifies for a baseline import.
fn baseline_candidate(s: &Suggestion) -> bool {
    s.is_open() && s.mirror().is_published() && s.votes().is_zero()
}

impl Engine {
    /// Applies an added or removed vote reaction. Returns whether a counter
    /// changed; foreign emoji, bot reactions and unknown messages are ignored.
    pub async fn apply_reaction_event(&self, event: &ReactionEvent) -> Result<bool> {
        if event.is_bot || event.mirror_message_id == 0 {
            return Ok(false);
        }
        let Some(kind) = VoteKind::from_emoji(&event.emoji) else {
            return Ok(false);
        };

        let community = event.community_id;
        let message_id = event.mirror_message_id;
        let delta = event.action.delta();
        let mutation = self
            .cache
            .update_where(
                community,
                |s| s.mirror_message_id == message_id,
                |s| Ok(apply_vote(s, kind, delta)),
            )
            .await?;

        match mutation {
            Mutation::Missing => {
                debug!(community = %community, message = message_id, "Reaction on unknown message");
                Ok(false)
            }
            Mutation::Unchanged => Ok(false),
            Mutation::Changed { after, .. } => {
                debug!(
                    community = %community,
                    id = after.id,
                    up = after.up_votes,
                    down = after.down_votes,
                    "Vote applied"
                );
                Ok(true)
            }
        }
    }

    /// Imports authoritative counts for open, published suggestions that have
    /// not recorded any vote yet. Counters that already diverged are left alone.
    /// Returns how many records were updated.
    pub async fn reconcile_baseline(
        &self,
        community: CommunityId,
        surface: &dyn ReactionSurface,
    ) -> Result<usize> {
        let candidates: Vec<Suggestion> = self
            .cache
            .list(community, true)
            .await?
            .into_iter()
            .filter(baseline_candidate)
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        let timeout = self.config.collaborator_timeout();
        let mut observed: HashMap<i64, VoteTally> = HashMap::new();
        for s in &candidates {
            let fetched = match tokio::time::timeout(timeout, surface.reaction_counts(s, s.mirror())).await {
                Ok(fetched) => fetched,
                Err(_) => Err(anyhow::anyhow!("timed out after {:?}", timeout)),
            };
            match fetched {
                Ok(Some(tally)) if !tally.is_zero() => {
                    observed.insert(s.id, tally);
                }
                Ok(_) => {}
                Err(e) => warn!(
                    community = %community,
                    id = s.id,
                    "Cannot fetch reaction counts: {}",
                    EngineError::Collaborator(e)
                ),
            }
        }
        if observed.is_empty() {
            return Ok(0);
        }

        // Re-check under the writer lock; events may have landed meanwhile.
        let updated = self
            .cache
            .update_batch(community, |s| {
                let tally = observed.get(&s.id)?;
                if !baseline_candidate(s) {
                    return None;
                }
                let mut next = s.clone();
                next.up_votes = tally.up;
                next.down_votes = tally.down;
                Some(next)
            })
            .await?;

        info!(
            community = %community,
            checked = candidates.len(),
            updated = updated.len(),
            "Baseline reconciliation finished"
        );
        Ok(updated.len())
    }
}
