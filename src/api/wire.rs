// Request and response shapes for the platform REST API.

use serde::Deserialize;
use serde_json::Value;

/// Whose activity a request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScope {
    /// The caller's own activity.
    Own { user_id: String },
    /// Activity by a resolved set of followed accounts. Never empty: the
    /// composer short-circuits before building a request for an empty set.
    Following { usernames: Vec<String> },
}

/// One read against the activity events endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    pub page: usize,
    pub page_size: usize,
    pub scope: EventScope,
    /// Server-side category filter (`type`).
    pub category: Option<String>,
    /// Server-side actor filter (`actor_id`).
    pub actor_id: Option<String>,
    /// Object-type allow-list. Empty means unrestricted.
    pub object_types: Vec<String>,
}

impl EventRequest {
    /// Query string pairs. Array parameters use repeated keys.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        match &self.scope {
            EventScope::Own { user_id } => params.push(("user_id", user_id.clone())),
            EventScope::Following { usernames } => {
                params.extend(usernames.iter().map(|u| ("username", u.clone())));
            }
        }
        if let Some(category) = &self.category {
            params.push(("type", category.clone()));
        }
        if let Some(actor) = &self.actor_id {
            params.push(("actor_id", actor.clone()));
        }
        params.extend(self.object_types.iter().map(|t| ("object_type", t.clone())));
        params
    }
}

/// A page of raw activity records.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "EventPageWire")]
pub struct EventPage {
    pub items: Vec<Value>,
    /// Server-reported total across all pages. Bulk lists omit it.
    pub total_items: Option<usize>,
}

impl EventPage {
    pub fn total(&self) -> usize {
        self.total_items.unwrap_or(self.items.len())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventPageWire {
    Paged {
        #[serde(alias = "results")]
        items: Vec<Value>,
        #[serde(default, rename = "totalItems", alias = "total_items", alias = "count")]
        total_items: Option<usize>,
    },
    Bare(Vec<Value>),
}

impl From<EventPageWire> for EventPage {
    fn from(wire: EventPageWire) -> Self {
        match wire {
            EventPageWire::Paged { items, total_items } => Self { items, total_items },
            EventPageWire::Bare(items) => Self {
                items,
                total_items: None,
            },
        }
    }
}

/// The following-list endpoint, in any of its shapes.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum FollowingResponse {
    List(Vec<FollowingEntry>),
    Wrapped {
        #[serde(alias = "results", alias = "items")]
        following: Vec<FollowingEntry>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum FollowingEntry {
    Name(String),
    Profile {
        #[serde(alias = "following_username")]
        username: String,
    },
}

impl FollowingResponse {
    pub(crate) fn into_usernames(self) -> Vec<String> {
        let entries = match self {
            FollowingResponse::List(entries) => entries,
            FollowingResponse::Wrapped { following } => following,
        };
        entries
            .into_iter()
            .map(|e| match e {
                FollowingEntry::Name(name) => name,
                FollowingEntry::Profile { username } => username,
            })
            .filter(|name| !name.trim().is_empty())
            .collect()
    }
}
