// Feed composer — turns a FeedQuery into one page of classified events.
//
// Resolves the sourcing scope (own activity, or the followed-account set),
// then runs either the server-delegated or the client-local strategy. Both
// strategies go through the same normalizer and produce the same page for
// the same logical dataset.

use tracing::{debug, info, warn};

use crate::activity::event::{normalize_batch, ActivityEvent};
use crate::activity::filter;
use crate::activity::paginator::Pagination;
use crate::api::traits::ActivitySource;
use crate::api::wire::{EventPage, EventRequest, EventScope};
use crate::error::{FeedError, FetchTarget};

use super::query::{FeedMode, FeedProfile, FeedQuery, FetchStrategy};

/// The account the feed is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub username: String,
}

/// Why a successfully loaded feed has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Following mode, and the caller follows nobody.
    NoFollowing,
    /// The source returned nothing matching the query.
    NoEvents,
}

/// One composed page.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub events: Vec<ActivityEvent>,
    pub pagination: Pagination,
    pub empty: Option<EmptyReason>,
    /// Events on this fetch that fell through to `Other`.
    pub classification_gaps: usize,
}

impl ComposedPage {
    fn empty(page_size: usize, reason: EmptyReason) -> Self {
        Self {
            events: Vec::new(),
            pagination: Pagination::new(page_size, 0),
            empty: Some(reason),
            classification_gaps: 0,
        }
    }
}

/// Compose the page described by `query`.
pub async fn compose(
    source: &dyn ActivitySource,
    caller: &Caller,
    profile: &FeedProfile,
    query: &FeedQuery,
) -> Result<ComposedPage, FeedError> {
    let scope = match query.mode {
        FeedMode::Own => EventScope::Own {
            user_id: caller.user_id.clone(),
        },
        FeedMode::Following => {
            let usernames = source
                .fetch_following(&caller.username)
                .await
                .map_err(|e| {
                    warn!(username = %caller.username, error = %e, "Failed to resolve following list");
                    FeedError::fetch(FetchTarget::Following, &e)
                })?;

            if usernames.is_empty() {
                info!(username = %caller.username, "Following list is empty, nothing to fetch");
                return Ok(ComposedPage::empty(profile.page_size, EmptyReason::NoFollowing));
            }

            debug!(count = usernames.len(), "Resolved following list");
            EventScope::Following { usernames }
        }
    };

    let composed = match profile.strategy_for(&query.filter) {
        FetchStrategy::ServerDelegated => server_delegated(source, profile, query, scope).await?,
        FetchStrategy::ClientLocal => client_local(source, profile, query, scope).await?,
    };

    debug!(
        mode = query.mode.as_str(),
        page = composed.pagination.page(),
        total = composed.pagination.total(),
        shown = composed.events.len(),
        gaps = composed.classification_gaps,
        "Composed feed page"
    );

    Ok(composed)
}

async fn server_delegated(
    source: &dyn ActivitySource,
    profile: &FeedProfile,
    query: &FeedQuery,
    scope: EventScope,
) -> Result<ComposedPage, FeedError> {
    let mut request = EventRequest {
        page: query.page.max(1),
        page_size: profile.page_size,
        scope,
        category: query
            .filter
            .category
            .and_then(|c| c.server_value())
            .map(String::from),
        actor_id: query.filter.actor_id.clone(),
        object_types: profile.allow_list.object_types().to_vec(),
    };

    let mut page = fetch(source, &request).await?;

    // Past the last page (stale page number after the dataset shrank, or a
    // hand-picked one): fetch the last page that exists instead.
    let last = Pagination::at(request.page, profile.page_size, page.total()).page();
    if last != request.page {
        debug!(requested = request.page, last, "Requested page is out of range, loading last page");
        request.page = last;
        page = fetch(source, &request).await?;
    }

    let total = page.total();
    let batch = normalize_batch(&page.items);

    let mut events = batch.events;
    events.truncate(profile.page_size);

    Ok(ComposedPage {
        pagination: Pagination::at(request.page, profile.page_size, total),
        empty: (total == 0).then_some(EmptyReason::NoEvents),
        classification_gaps: batch.classification_gaps,
        events,
    })
}

async fn client_local(
    source: &dyn ActivitySource,
    profile: &FeedProfile,
    query: &FeedQuery,
    scope: EventScope,
) -> Result<ComposedPage, FeedError> {
    let request = EventRequest {
        page: 1,
        page_size: profile.bulk_page_size,
        scope,
        category: None,
        actor_id: None,
        object_types: Vec::new(),
    };

    let page = fetch(source, &request).await?;
    if page.total() > page.items.len() {
        warn!(
            fetched = page.items.len(),
            total = page.total(),
            "Bulk fetch truncated by the server, older events are not shown"
        );
    }

    let batch = normalize_batch(&page.items);
    let visible = filter::apply(&batch.events, &profile.allow_list, &query.filter);
    let pagination = Pagination::at(query.page, profile.page_size, visible.len());
    let events = pagination
        .slice(&visible)
        .iter()
        .map(|e| (*e).clone())
        .collect();

    Ok(ComposedPage {
        events,
        pagination,
        empty: visible.is_empty().then_some(EmptyReason::NoEvents),
        classification_gaps: batch.classification_gaps,
    })
}

async fn fetch(
    source: &dyn ActivitySource,
    request: &EventRequest,
) -> Result<EventPage, FeedError> {
    source.fetch_events(request).await.map_err(|e| {
        warn!(page = request.page, error = %e, "Failed to fetch activity events");
        FeedError::fetch(FetchTarget::Events, &e)
    })
}
