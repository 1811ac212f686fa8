// ActivitySource trait — the collaborator seam between the feed engine and
// the platform API.
//
// ApiClient implements it over HTTP. Tests and offline tools provide their
// own in-memory implementations, so the engine never knows where events
// come from.

use anyhow::Result;
use async_trait::async_trait;

use super::wire::{EventPage, EventRequest};
use crate::activity::reactions::Reaction;

#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Read one page of raw activity records.
    async fn fetch_events(&self, request: &EventRequest) -> Result<EventPage>;

    /// Resolve the usernames `username` follows.
    async fn fetch_following(&self, username: &str) -> Result<Vec<String>>;

    /// Record the caller's reaction on a post. Idempotent per caller and post.
    async fn react_to_post(&self, post_id: &str, reaction: Reaction) -> Result<()>;
}
