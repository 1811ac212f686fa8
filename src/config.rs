use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::activity::paginator::DEFAULT_PAGE_SIZE;
use crate::api::client::DEFAULT_API_URL;
use crate::feed::composer::Caller;
use crate::feed::query::DEFAULT_BULK_PAGE_SIZE;

/// Central configuration loaded from environment variables.
///
/// The API token comes from the environment only (never hardcoded). The
/// .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    pub api_url: String,
    /// Bearer token for the platform API. Optional for public read endpoints.
    pub api_token: Option<String>,
    pub user_id: String,
    pub username: String,
    pub page_size: usize,
    /// Size of the single request client-local surfaces make.
    pub bulk_page_size: usize,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the caller identity, which is only
    /// checked by commands that build a feed.
    pub fn load() -> Result<Self> {
        Ok(Self {
            api_url: env::var("ECOFEED_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_token: env::var("ECOFEED_API_TOKEN").ok().filter(|t| !t.is_empty()),
            user_id: env::var("ECOFEED_USER_ID").unwrap_or_default(),
            username: env::var("ECOFEED_USERNAME").unwrap_or_default(),
            page_size: parse_size("ECOFEED_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            bulk_page_size: parse_size("ECOFEED_BULK_PAGE_SIZE", DEFAULT_BULK_PAGE_SIZE)?,
            timeout: Duration::from_secs(parse_var("ECOFEED_TIMEOUT_SECS", 30)?),
        })
    }

    /// Check that the caller identity is configured.
    /// Call this before building a feed.
    pub fn require_caller(&self) -> Result<Caller> {
        if self.user_id.is_empty() || self.username.is_empty() {
            anyhow::bail!(
                "ECOFEED_USER_ID and ECOFEED_USERNAME must both be set.\n\
                 Add them to your .env file."
            );
        }
        Ok(Caller {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
        })
    }
}

/// Page sizes must be at least 1.
fn parse_size(name: &str, default: usize) -> Result<usize> {
    let size = parse_var(name, default)?;
    if size == 0 {
        anyhow::bail!("{name} must be at least 1, got 0");
    }
    Ok(size)
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        _ => Ok(default),
    }
}
