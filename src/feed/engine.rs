// Feed engine — the stateful wrapper a UI surface talks to.
//
// Every interaction becomes a new FeedQuery and a fresh load. Loads may
// overlap (a refresh still in flight when the filter changes), so each load
// takes a ticket under the state lock and only the holder of the newest
// ticket may write its result back. Older results are dropped on arrival.
//
// The state lock is never held across a collaborator call.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::activity::event::ActivityEvent;
use crate::activity::filter::CategoryFilter;
use crate::activity::paginator::Pagination;
use crate::activity::reactions::Reaction;
use crate::api::traits::ActivitySource;
use crate::error::{FeedError, FetchTarget};

use super::composer::{compose, Caller, EmptyReason};
use super::query::{FeedMode, FeedProfile, FeedQuery};

/// Snapshot of everything a surface renders.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    /// The selection the view belongs to (or is loading).
    pub query: FeedQuery,
    /// The current page of events.
    pub events: Vec<ActivityEvent>,
    pub pagination: Pagination,
    pub loading: bool,
    /// Set when the last load failed. Distinct from an empty feed.
    pub error: Option<FeedError>,
    /// Set when the last load succeeded with nothing to show.
    pub empty: Option<EmptyReason>,
    pub classification_gaps: usize,
}

impl FeedView {
    fn initial(query: FeedQuery, page_size: usize) -> Self {
        Self {
            query,
            events: Vec::new(),
            pagination: Pagination::new(page_size, 0),
            loading: false,
            error: None,
            empty: None,
            classification_gaps: 0,
        }
    }
}

struct FeedState {
    view: FeedView,
    /// Ticket of the most recently issued load.
    ticket: u64,
}

/// One feed instance. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FeedEngine {
    source: Arc<dyn ActivitySource>,
    caller: Caller,
    profile: FeedProfile,
    state: Arc<RwLock<FeedState>>,
}

impl FeedEngine {
    /// Create an engine in `mode`. Nothing is fetched until `load`.
    pub fn new(
        source: Arc<dyn ActivitySource>,
        caller: Caller,
        profile: FeedProfile,
        mode: FeedMode,
    ) -> Self {
        let view = FeedView::initial(FeedQuery::new(mode), profile.page_size);
        Self {
            source,
            caller,
            profile,
            state: Arc::new(RwLock::new(FeedState { view, ticket: 0 })),
        }
    }

    pub fn profile(&self) -> &FeedProfile {
        &self.profile
    }

    /// Current snapshot.
    pub async fn view(&self) -> FeedView {
        self.state.read().await.view.clone()
    }

    pub async fn query(&self) -> FeedQuery {
        self.state.read().await.view.query.clone()
    }

    /// Load `query`, replacing whatever the feed showed before.
    ///
    /// Returns the snapshot after this load settles. If a newer load was
    /// issued meanwhile, this load's result is discarded and the returned
    /// snapshot is whatever state the newer load has left.
    pub async fn apply(&self, query: FeedQuery) -> FeedView {
        self.update(|_| query).await
    }

    /// Derive the next query from the current one and load it. The
    /// derivation runs under the same lock that issues the ticket, so
    /// concurrent updates never start from the same base query.
    async fn update<F>(&self, next: F) -> FeedView
    where
        F: FnOnce(&FeedQuery) -> FeedQuery,
    {
        match self.begin(|view| Some(next(&view.query))).await {
            Some((ticket, query)) => self.settle(ticket, query).await,
            None => self.view().await,
        }
    }

    /// Take a ticket for the query `next` derives from the current view.
    /// `None` from `next` leaves the state untouched.
    async fn begin<F>(&self, next: F) -> Option<(u64, FeedQuery)>
    where
        F: FnOnce(&FeedView) -> Option<FeedQuery>,
    {
        let mut state = self.state.write().await;
        let query = next(&state.view)?;
        state.ticket += 1;
        state.view.query = query.clone();
        state.view.loading = true;
        Some((state.ticket, query))
    }

    async fn settle(&self, ticket: u64, query: FeedQuery) -> FeedView {
        debug!(ticket, mode = query.mode.as_str(), page = query.page, "Feed load started");

        let result = compose(self.source.as_ref(), &self.caller, &self.profile, &query).await;

        let mut state = self.state.write().await;
        if state.ticket != ticket {
            debug!(ticket, current = state.ticket, "Discarding stale feed response");
            return state.view.clone();
        }

        let view = &mut state.view;
        view.loading = false;
        match result {
            Ok(page) => {
                // The composer clamps out-of-range pages
                view.query.page = page.pagination.page();
                view.events = page.events;
                view.pagination = page.pagination;
                view.empty = page.empty;
                view.classification_gaps = page.classification_gaps;
                view.error = None;
            }
            Err(e) => {
                warn!(ticket, error = %e, "Feed load failed");
                view.events.clear();
                view.pagination = Pagination::new(self.profile.page_size, 0);
                view.empty = None;
                view.classification_gaps = 0;
                view.error = Some(e);
            }
        }
        view.clone()
    }

    /// Initial load of the current query.
    pub async fn load(&self) -> FeedView {
        self.refresh().await
    }

    /// Re-fetch the current query (pull-to-refresh, retry).
    pub async fn refresh(&self) -> FeedView {
        self.update(FeedQuery::clone).await
    }

    /// Switch between own and following activity. Filters and page reset.
    pub async fn set_mode(&self, mode: FeedMode) -> FeedView {
        self.update(|q| q.with_mode(mode)).await
    }

    pub async fn set_category(&self, category: Option<CategoryFilter>) -> FeedView {
        self.update(|q| q.with_category(category)).await
    }

    pub async fn set_actor(&self, actor_id: Option<String>) -> FeedView {
        self.update(|q| q.with_actor(actor_id)).await
    }

    /// Go to `page`. Pages outside the current range are a no-op and
    /// return `None` without fetching.
    pub async fn set_page(&self, page: usize) -> Option<FeedView> {
        self.step(|_| page).await
    }

    pub async fn next_page(&self) -> Option<FeedView> {
        self.step(|p| p.page() + 1).await
    }

    pub async fn previous_page(&self) -> Option<FeedView> {
        self.step(|p| p.page().saturating_sub(1)).await
    }

    async fn step<F>(&self, target: F) -> Option<FeedView>
    where
        F: FnOnce(&Pagination) -> usize,
    {
        let started = self
            .begin(|view| {
                let page = target(&view.pagination);
                if view.pagination.contains(page) {
                    Some(view.query.with_page(page))
                } else {
                    debug!(page, "Ignoring out-of-range page request");
                    None
                }
            })
            .await;
        let (ticket, query) = started?;
        Some(self.settle(ticket, query).await)
    }

    /// Send a like/dislike for `post_id`, then re-fetch the whole feed.
    ///
    /// A failed mutation is returned to the caller and leaves the feed as
    /// it was.
    pub async fn react(&self, post_id: &str, reaction: Reaction) -> Result<FeedView, FeedError> {
        if let Err(e) = self.source.react_to_post(post_id, reaction).await {
            warn!(post_id, reaction = %reaction, error = %e, "Post reaction failed");
            return Err(FeedError::fetch(FetchTarget::Reaction, &e));
        }

        info!(post_id, reaction = %reaction, "Post reaction recorded, refreshing feed");
        Ok(self.refresh().await)
    }
}
