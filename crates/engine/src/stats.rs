use domain::{Suggestion, SuggestionStatus, UserId};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuggestionStats {
    pub total: usize,
    pub open: usize,
    pub rejected: usize,
    /// `implemented` plus `already_implemented`.
    pub implemented: usize,
    pub removed: usize,
    pub top_contributor: Option<Contributor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub user_id: UserId,
    pub suggestions: usize,
}

impl SuggestionStats {
    /// `rows` must be in insertion order; it decides ties for top contributor.
    pub fn from_suggestions(rows: &[Suggestion]) -> Self {
        let mut stats = SuggestionStats {
            total: rows.len(),
            ..Default::default()
        };
        let mut per_author: HashMap<UserId, usize> = HashMap::new();
        let mut first_seen: Vec<UserId> = Vec::new();

        for s in rows {
            match s.status {
                SuggestionStatus::Suggested => stats.open += 1,
                SuggestionStatus::Rejected => stats.rejected += 1,
                SuggestionStatus::Implemented | SuggestionStatus::AlreadyImplemented => {
                    stats.implemented += 1
                }
                SuggestionStatus::Removed => stats.removed += 1,
                _ => {}
            }
            let count = per_author.entry(s.author_id).or_insert(0);
            if *count == 0 {
                first_seen.push(s.author_id);
            }
            *count += 1;
        }

        for user_id in first_seen {
            let suggestions = per_author[&user_id];
            let better = stats
                .top_contributor
                .as_ref()
                .map_or(true, |top| suggestions > top.suggestions);
            if better {
                stats.top_contributor = Some(Contributor {
                    user_id,
                    suggestions,
                });
            }
        }
        stats
    }
}
