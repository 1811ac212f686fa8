// Filter engine — category and actor filters plus the object-type allow-list.
//
// The same FeedFilter drives both operating modes: serialized into request
// parameters when the server filters, or evaluated in memory over a held
// batch. `matches` is the single definition of what a filter accepts, and the
// server-side encoding must mean exactly the same thing.

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::event::ActivityEvent;

/// A user-chosen category filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// Exactly one category.
    Only(Category),
    /// Any post category (create, update, delete). Has no server encoding.
    Posts,
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::Only(c) => *c == category,
            CategoryFilter::Posts => category.is_post(),
        }
    }

    /// The value sent as the `type` request parameter, if the server can
    /// apply this filter itself.
    pub fn server_value(&self) -> Option<&'static str> {
        match self {
            CategoryFilter::Only(c) => Some(c.as_str()),
            CategoryFilter::Posts => None,
        }
    }

    /// Parse a CLI-style name: a category name or `posts`.
    pub fn parse(name: &str) -> Option<Self> {
        if name.trim().eq_ignore_ascii_case("posts") {
            return Some(CategoryFilter::Posts);
        }
        Category::parse(name).map(CategoryFilter::Only)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CategoryFilter::Only(c) => c.as_str(),
            CategoryFilter::Posts => "Posts",
        }
    }
}

/// The user-chosen filter dimensions. Both are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    pub category: Option<CategoryFilter>,
    /// Exact match against the event's actor id.
    pub actor_id: Option<String>,
}

impl FeedFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.actor_id.is_none()
    }

    pub fn matches(&self, event: &ActivityEvent) -> bool {
        if let Some(category) = &self.category {
            if !category.matches(event.category) {
                return false;
            }
        }
        if let Some(actor) = &self.actor_id {
            if event.actor_id.as_deref() != Some(actor.as_str()) {
                return false;
            }
        }
        true
    }

    /// Whether every active dimension has a server-side encoding.
    pub fn is_server_expressible(&self) -> bool {
        match self.category {
            Some(category) => category.server_value().is_some(),
            None => true,
        }
    }
}

/// An optional restriction to a supported subset of object types.
///
/// Events outside the list are excluded outright, including events with no
/// object type at all. An empty list means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList(Vec<String>);

impl AllowList {
    pub fn new<I, S>(object_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(object_types.into_iter().map(Into::into).collect())
    }

    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn object_types(&self) -> &[String] {
        &self.0
    }

    pub fn permits(&self, event: &ActivityEvent) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        event
            .object_type
            .as_deref()
            .is_some_and(|t| self.0.iter().any(|allowed| allowed == t))
    }
}

/// Client-local filtering: the allow-list first, then the user filter.
///
/// Returns a view over the input; records are never modified or reordered.
pub fn apply<'a>(
    events: &'a [ActivityEvent],
    allow_list: &AllowList,
    filter: &FeedFilter,
) -> Vec<&'a ActivityEvent> {
    events
        .iter()
        .filter(|e| allow_list.permits(e) && filter.matches(e))
        .collect()
}
