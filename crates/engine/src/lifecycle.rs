use crate::cache::Mutation;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::outbox::Outbound;
use domain::{AuditEvent, CommunityId, Suggestion, SuggestionStatus, UserId};
use tracing::info;

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Reviewer(UserId),
    /// Automated reconciliation. Keeps the previous reviewer on record.
    Reconciler,
}

impl Actor {
    fn validate(&self) -> Result<()> {
        match self {
            Actor::Reviewer(0) => Err(EngineError::InvalidArgument(
                "a reviewer is required for status changes".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Computes the record after moving `current` to `status`, or `None` when it
/// is already there.
pub(crate) fn transition(
    current: &Suggestion,
    status: SuggestionStatus,
    actor: Actor,
    remarks: Option<&str>,
) -> Result<Option<Suggestion>> {
    if current.status == status {
        return Ok(None);
    }
    if current.status == SuggestionStatus::Removed {
        return Err(EngineError::InvalidArgument(format!(
            "suggestion #{} was removed and cannot become {}",
            current.id,
            status.as_str()
        )));
    }
    if status == SuggestionStatus::Suggested {
        return Err(EngineError::InvalidArgument(format!(
            "suggestion #{} cannot be reopened",
            current.id
        )));
    }

    let mut next = current.clone();
    next.status = status;
    if let Actor::Reviewer(reviewer) = actor {
        next.reviewer_id = Some(reviewer);
    }
    next.remarks = remarks
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    Ok(Some(next))
}

impl Engine {
    /// Moves a suggestion to `status`. Returns `Ok(false)` when it already had
    /// that status, in which case nothing is written or queued.
    pub async fn set_status(
        &self,
        community: CommunityId,
        id: i64,
        status: SuggestionStatus,
        actor: Actor,
        remarks: Option<&str>,
    ) -> Result<bool> {
        actor.validate()?;

        let mutation = self
            .cache
            .update(community, id, |current| {
                transition(current, status, actor, remarks)
            })
            .await?;
        let (before, after) = match mutation {
            Mutation::Missing => {
                return Err(EngineError::NotFound(format!("suggestion #{}", id)))
            }
            Mutation::Unchanged => return Ok(false),
            Mutation::Changed { before, after } => (before, after),
        };

        info!(
            community = %community,
            id,
            reviewer = ?after.reviewer_id,
            "Status changed: {} -> {}",
            before.status,
            after.status
        );

        let mirror = after.mirror();
        let link = if status == SuggestionStatus::Removed || !mirror.is_published() {
            None
        } else {
            self.mirror.link(community, mirror)
        };
        self.audit(
            community,
            AuditEvent::StatusChanged {
                suggestion_id: id,
                old_status: before.status,
                new_status: after.status,
                reviewer_id: after.reviewer_id,
                remarks: after.remarks.clone(),
                link,
            },
        );

        if status == SuggestionStatus::Removed {
            self.outbox.send(Outbound::Teardown { community, id });
        } else {
            self.outbox.send(Outbound::Update { community, id });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{config, harness_with};
    use crate::testutil::{eventually, suggestion, MemoryRepository, MirrorCall, StaticMembers};
    use domain::MirrorRef;
    use std::sync::atomic::Ordering;

    const C: CommunityId = CommunityId::new(1);

    fn published(id: i64) -> Suggestion {
        let mut s = suggestion(C, id, 10);
        s.mirror_message_id = 500 + id as u64;
        s.mirror_thread_id = 600 + id as u64;
        s
    }

    #[test]
    fn transition_rules() {
        let open = suggestion(C, 1, 10);
        let accepted = transition(&open, SuggestionStatus::Accepted, Actor::Reviewer(3), None)
            .unwrap()
            .unwrap();
        assert_eq!(accepted.reviewer_id, Some(3));

        assert!(transition(&open, SuggestionStatus::Suggested, Actor::Reviewer(3), None)
            .unwrap()
            .is_none());
        assert!(matches!(
            transition(&accepted, SuggestionStatus::Suggested, Actor::Reviewer(3), None),
            Err(EngineError::InvalidArgument(_))
        ));

        let implemented =
            transition(&accepted, SuggestionStatus::Implemented, Actor::Reconciler, Some("  "))
                .unwrap()
                .unwrap();
        assert_eq!(implemented.reviewer_id, Some(3));
        assert_eq!(implemented.remarks, None);

        let mut removed = open.clone();
        removed.status = SuggestionStatus::Removed;
        assert!(transition(&removed, SuggestionStatus::Removed, Actor::Reviewer(3), None)
            .unwrap()
            .is_none());
        for status in SuggestionStatus::ALL {
            if status != SuggestionStatus::Removed {
                assert!(transition(&removed, status, Actor::Reviewer(3), None).is_err());
            }
        }
    }

    #[tokio::test]
    async fn same_status_is_a_silent_no_op() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        let changed = h
            .engine
            .set_status(C, 1, SuggestionStatus::Suggested, Actor::Reviewer(3), Some("hm"))
            .await
            .unwrap();
        assert!(!changed);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(h.repo.writes.load(Ordering::SeqCst), 0);
        assert!(h.mirror.calls().is_empty());
        assert!(h.audit.events().is_empty());
    }

    #[tokio::test]
    async fn change_is_persisted_audited_and_mirrored() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        let changed = h
            .engine
            .set_status(C, 1, SuggestionStatus::Accepted, Actor::Reviewer(3), Some("soon"))
            .await
            .unwrap();
        assert!(changed);

        let stored = &h.repo.suggestions()[0];
        assert_eq!(stored.status, SuggestionStatus::Accepted);
        assert_eq!(stored.reviewer_id, Some(3));
        assert_eq!(stored.remarks.as_deref(), Some("soon"));

        assert!(eventually(|| h.mirror.calls().len() == 1 && h.audit.events().len() == 1).await);
        let mirror = MirrorRef {
            message_id: 501,
            thread_id: 601,
        };
        assert_eq!(h.mirror.calls(), vec![MirrorCall::Update(1, mirror)]);
        assert_eq!(
            h.audit.events()[0],
            AuditEvent::StatusChanged {
                suggestion_id: 1,
                old_status: SuggestionStatus::Suggested,
                new_status: SuggestionStatus::Accepted,
                reviewer_id: Some(3),
                remarks: Some("soon".into()),
                link: Some("https://chat.example/1/501".into()),
            }
        );
    }

    #[tokio::test]
    async fn closed_thread_is_stored_after_update() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        h.mirror.close_threads_on_update();
        h.engine
            .set_status(C, 1, SuggestionStatus::Rejected, Actor::Reviewer(3), None)
            .await
            .unwrap();

        assert!(eventually(|| h.repo.suggestions()[0].mirror_thread_id == 0).await);
        let cached = h.engine.get_by_id(C, 1).await.unwrap().unwrap();
        assert_eq!(cached.mirror_message_id, 501);
        assert_eq!(cached.mirror_thread_id, 0);
    }

    #[tokio::test]
    async fn removal_tears_down_and_is_terminal() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        h.engine
            .set_status(C, 1, SuggestionStatus::Removed, Actor::Reviewer(3), None)
            .await
            .unwrap();
        assert!(eventually(|| !h.mirror.calls().is_empty()).await);
        assert!(matches!(h.mirror.calls()[0], MirrorCall::Teardown(1, _)));
        assert!(eventually(|| h.audit.events().len() == 1).await);
        assert!(matches!(
            &h.audit.events()[0],
            AuditEvent::StatusChanged { link: None, .. }
        ));

        let err = h
            .engine
            .set_status(C, 1, SuggestionStatus::Accepted, Actor::Reviewer(3), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(
            h.engine.get_by_id(C, 1).await.unwrap().unwrap().status,
            SuggestionStatus::Removed
        );
    }

    #[tokio::test]
    async fn rejects_missing_reviewer_and_unknown_suggestion() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        let err = h
            .engine
            .set_status(C, 1, SuggestionStatus::Accepted, Actor::Reviewer(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let err = h
            .engine
            .set_status(C, 42, SuggestionStatus::Accepted, Actor::Reviewer(3), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        assert!(h
            .engine
            .set_status(C, 1, SuggestionStatus::Duplicate, Actor::Reconciler, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn audit_failure_does_not_undo_the_change() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        h.audit.fail(true);
        assert!(h
            .engine
            .set_status(C, 1, SuggestionStatus::Implemented, Actor::Reviewer(3), None)
            .await
            .unwrap());

        // audit is retried and dropped, then the mirror update still goes out
        assert!(eventually(|| h.mirror.calls().len() == 1).await);
        assert!(h.audit.events().is_empty());
        assert_eq!(h.repo.suggestions()[0].status, SuggestionStatus::Implemented);
    }

    #[tokio::test]
    async fn persistence_failure_leaves_state_untouched() {
        let h = harness_with(
            MemoryRepository::with_suggestions(vec![published(1)]),
            StaticMembers::default(),
            config(0),
        );
        h.repo.fail_writes(true);
        let err = h
            .engine
            .set_status(C, 1, SuggestionStatus::Accepted, Actor::Reviewer(3), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        assert_eq!(
            h.engine.get_by_id(C, 1).await.unwrap().unwrap().status,
            SuggestionStatus::Suggested
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(h.mirror.calls().is_empty());
    }
}
