// Feed queries and surface presets.
//
// A FeedQuery is the whole user-controlled selection (mode, filter, page) as
// one value. UI interactions produce a new query; the engine reacts to it.
// Surfaces differ only in their FeedProfile: fetch strategy, allow-list, and
// which category filters they offer.

use serde::{Deserialize, Serialize};

use crate::activity::category::Category;
use crate::activity::filter::{AllowList, CategoryFilter, FeedFilter};
use crate::activity::paginator::DEFAULT_PAGE_SIZE;

/// Bulk page size for client-local surfaces.
pub const DEFAULT_BULK_PAGE_SIZE: usize = 1000;

/// Whose activity the feed shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedMode {
    #[default]
    Own,
    Following,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Own => "own",
            FeedMode::Following => "following",
        }
    }
}

/// Where filtering and paging happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStrategy {
    /// Filters and page go to the server; one request per page.
    ServerDelegated,
    /// One bulk request; filtering and paging happen in memory.
    ClientLocal,
}

/// The full user selection for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub mode: FeedMode,
    pub filter: FeedFilter,
    /// 1-based.
    pub page: usize,
}

impl FeedQuery {
    /// First page of `mode` with no filters.
    pub fn new(mode: FeedMode) -> Self {
        Self {
            mode,
            filter: FeedFilter::default(),
            page: 1,
        }
    }

    /// Switching mode discards filters and paging entirely.
    pub fn with_mode(&self, mode: FeedMode) -> Self {
        Self::new(mode)
    }

    pub fn with_category(&self, category: Option<CategoryFilter>) -> Self {
        Self {
            mode: self.mode,
            filter: FeedFilter {
                category,
                actor_id: self.filter.actor_id.clone(),
            },
            page: 1,
        }
    }

    pub fn with_actor(&self, actor_id: Option<String>) -> Self {
        Self {
            mode: self.mode,
            filter: FeedFilter {
                category: self.filter.category,
                actor_id: actor_id.filter(|a| !a.trim().is_empty()),
            },
            page: 1,
        }
    }

    pub fn with_page(&self, page: usize) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self::new(FeedMode::default())
    }
}

/// The three client surfaces that host a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    WebAdmin,
    WebUser,
    Mobile,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::WebAdmin, Surface::WebUser, Surface::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::WebAdmin => "web-admin",
            Surface::WebUser => "web-user",
            Surface::Mobile => "mobile",
        }
    }

    /// The engine configuration for this surface.
    pub fn profile(&self, page_size: usize, bulk_page_size: usize) -> FeedProfile {
        match self {
            Surface::WebAdmin => FeedProfile {
                strategy: FetchStrategy::ServerDelegated,
                allow_list: AllowList::unrestricted(),
                page_size,
                bulk_page_size,
                category_options: Category::ALL.into_iter().map(CategoryFilter::Only).collect(),
            },
            Surface::WebUser => FeedProfile {
                strategy: FetchStrategy::ClientLocal,
                allow_list: AllowList::new(["UserWaste", "Note", "Comment", "Follow"]),
                page_size,
                bulk_page_size,
                category_options: vec![
                    CategoryFilter::Only(Category::CreateWaste),
                    CategoryFilter::Posts,
                    CategoryFilter::Only(Category::CreateComment),
                    CategoryFilter::Only(Category::UpdateComment),
                    CategoryFilter::Only(Category::LikePost),
                    CategoryFilter::Only(Category::FollowUser),
                    CategoryFilter::Only(Category::UnfollowUser),
                ],
            },
            Surface::Mobile => FeedProfile {
                strategy: FetchStrategy::ClientLocal,
                allow_list: AllowList::new(["UserWaste", "Note", "Follow"]),
                page_size,
                bulk_page_size,
                category_options: vec![
                    CategoryFilter::Only(Category::CreateWaste),
                    CategoryFilter::Posts,
                    CategoryFilter::Only(Category::FollowUser),
                    CategoryFilter::Only(Category::UnfollowUser),
                ],
            },
        }
    }
}

/// Engine configuration supplied by a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedProfile {
    pub strategy: FetchStrategy,
    pub allow_list: AllowList,
    pub page_size: usize,
    /// Request size for the single client-local fetch.
    pub bulk_page_size: usize,
    /// Category filters this surface offers, in display order.
    pub category_options: Vec<CategoryFilter>,
}

impl FeedProfile {
    /// The strategy to use for `filter`. A server-delegated profile falls back
    /// to client-local when the filter has no server encoding.
    pub fn strategy_for(&self, filter: &FeedFilter) -> FetchStrategy {
        match self.strategy {
            FetchStrategy::ServerDelegated if !filter.is_server_expressible() => {
                FetchStrategy::ClientLocal
            }
            strategy => strategy,
        }
    }
}

impl Default for FeedProfile {
    fn default() -> Self {
        Surface::WebUser.profile(DEFAULT_PAGE_SIZE, DEFAULT_BULK_PAGE_SIZE)
    }
}
