use serde::{Deserialize, Serialize};

pub const UPVOTE_EMOJI: &str = "👍";
pub const DOWNVOTE_EMOJI: &str = "👎";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// Only the two vote emoji count; every other reaction is decoration.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            UPVOTE_EMOJI => Some(VoteKind::Up),
            DOWNVOTE_EMOJI => Some(VoteKind::Down),
            _ => None,
        }
    }
}
