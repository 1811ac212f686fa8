// Action embedding resolver — like/dislike state embedded on post events.
//
// Counters live in the event payload under whichever names the API build
// uses. A missing or malformed counter reads as zero / not reacted: a broken
// secondary field never stops the event itself from rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::ActivityEvent;

const LIKE_COUNT_KEYS: &[&str] = &["like_count", "likes_count", "likes"];
const DISLIKE_COUNT_KEYS: &[&str] = &["dislike_count", "dislikes_count", "dislikes"];
const LIKED_KEYS: &[&str] = &["is_liked", "liked_by_user", "user_liked"];
const DISLIKED_KEYS: &[&str] = &["is_disliked", "disliked_by_user", "user_disliked"];

/// A reaction the caller can send for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

impl std::fmt::Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current reaction counters and the caller's own reaction on one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReactions {
    pub like_count: u64,
    pub dislike_count: u64,
    pub is_liked_by_caller: bool,
    pub is_disliked_by_caller: bool,
}

impl PostReactions {
    /// Resolve reactions for a post event. Non-post events have none.
    pub fn resolve(event: &ActivityEvent) -> Option<Self> {
        if !event.category.is_post() {
            return None;
        }
        Some(Self::from_payload(&event.payload))
    }

    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            like_count: first_count(payload, LIKE_COUNT_KEYS),
            dislike_count: first_count(payload, DISLIKE_COUNT_KEYS),
            is_liked_by_caller: first_flag(payload, LIKED_KEYS),
            is_disliked_by_caller: first_flag(payload, DISLIKED_KEYS),
        }
    }
}

fn first_count(payload: &Map<String, Value>, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|k| match payload.get(*k)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

fn first_flag(payload: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|k| payload.get(*k)?.as_bool())
        .unwrap_or(false)
}
