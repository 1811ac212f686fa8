// HTTP client for the platform REST API.
//
// A thin reqwest wrapper with one generic GET helper, in the same shape for
// every read endpoint. Timeouts are configured on the underlying client and
// surface as ordinary request errors.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::traits::ActivitySource;
use super::wire::{EventPage, EventRequest, FollowingResponse};
use crate::activity::reactions::Reaction;

/// Default API endpoint for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Authenticated client for the activity, following, and post-action endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url`. `token`, when set, is sent as a bearer token.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ecofeed/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET `path` with the given query pairs and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        debug!(path = path, "API GET request");

        let response = self
            .authorize(self.client.get(&url))
            .query(params)
            .send()
            .await
            .with_context(|| format!("API request failed: GET {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize GET {path} response"))
    }
}

#[async_trait]
impl ActivitySource for ApiClient {
    async fn fetch_events(&self, request: &EventRequest) -> Result<EventPage> {
        let page: EventPage = self
            .get_json("/activities/", &request.query_params())
            .await
            .context("Failed to fetch activity events")?;

        debug!(
            page = request.page,
            items = page.items.len(),
            total = ?page.total_items,
            "Fetched activity page"
        );

        Ok(page)
    }

    async fn fetch_following(&self, username: &str) -> Result<Vec<String>> {
        let path = format!("/users/{username}/following/");
        let resp: FollowingResponse = self
            .get_json(&path, &[])
            .await
            .with_context(|| format!("Failed to fetch following list for @{username}"))?;
        Ok(resp.into_usernames())
    }

    async fn react_to_post(&self, post_id: &str, reaction: Reaction) -> Result<()> {
        let path = format!("/posts/{post_id}/{}/", reaction.as_str());
        let url = format!("{}{}", self.base_url, path);

        debug!(post_id = post_id, reaction = %reaction, "API POST request");

        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .with_context(|| format!("API request failed: POST {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("POST {path} returned {status}: {body}");
        }

        Ok(())
    }
}
