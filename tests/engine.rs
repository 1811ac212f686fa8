// Engine tests — the feed engine driven against an in-memory API.
//
// InMemorySource behaves like the real server: it scopes, filters, and pages
// a fixed dataset using the same classifier the client uses. That lets the
// server-delegated and client-local strategies be compared directly.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use ecofeed::activity::category::Category;
use ecofeed::activity::event::normalize;
use ecofeed::activity::filter::{AllowList, CategoryFilter};
use ecofeed::activity::reactions::{PostReactions, Reaction};
use ecofeed::api::traits::ActivitySource;
use ecofeed::api::wire::{EventPage, EventRequest, EventScope};
use ecofeed::error::{FeedError, FetchTarget};
use ecofeed::feed::composer::{Caller, EmptyReason};
use ecofeed::feed::engine::FeedEngine;
use ecofeed::feed::query::{FeedMode, FeedProfile, FeedQuery, FetchStrategy};

// ============================================================
// In-memory API
// ============================================================

struct InMemorySource {
    dataset: Mutex<Vec<Value>>,
    /// `None` makes the following endpoint fail.
    following: Option<Vec<String>>,
    fail_events: Mutex<bool>,
    fail_reactions: bool,
    /// The first events fetch waits on this before answering.
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    requests: Mutex<Vec<EventRequest>>,
    following_calls: Mutex<usize>,
}

impl InMemorySource {
    fn new(dataset: Vec<Value>) -> Self {
        Self {
            dataset: Mutex::new(dataset),
            following: Some(Vec::new()),
            fail_events: Mutex::new(false),
            fail_reactions: false,
            gate: tokio::sync::Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            following_calls: Mutex::new(0),
        }
    }

    fn following(mut self, usernames: Option<&[&str]>) -> Self {
        self.following = usernames.map(|u| u.iter().map(|s| s.to_string()).collect());
        self
    }

    fn gated(mut self, rx: oneshot::Receiver<()>) -> Self {
        self.gate = tokio::sync::Mutex::new(Some(rx));
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn set_failing(&self, failing: bool) {
        *self.fail_events.lock().unwrap() = failing;
    }
}

#[async_trait]
impl ActivitySource for InMemorySource {
    async fn fetch_events(&self, request: &EventRequest) -> Result<EventPage> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().await.take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        if *self.fail_events.lock().unwrap() {
            anyhow::bail!("GET /activities/ returned 503 Service Unavailable");
        }

        let dataset = self.dataset.lock().unwrap().clone();
        let matching: Vec<Value> = dataset
            .into_iter()
            .filter(|raw| {
                let event = normalize(raw).unwrap();
                let in_scope = match &request.scope {
                    EventScope::Own { user_id } => event.actor_id.as_deref() == Some(user_id.as_str()),
                    EventScope::Following { usernames } => event
                        .actor_username
                        .as_ref()
                        .is_some_and(|u| usernames.contains(u)),
                };
                let allowed = request.object_types.is_empty()
                    || event
                        .object_type
                        .as_ref()
                        .is_some_and(|t| request.object_types.contains(t));
                let category_ok = request
                    .category
                    .as_deref()
                    .map_or(true, |c| event.category.as_str() == c);
                let actor_ok = request
                    .actor_id
                    .as_deref()
                    .map_or(true, |a| event.actor_id.as_deref() == Some(a));
                in_scope && allowed && category_ok && actor_ok
            })
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((request.page - 1) * request.page_size)
            .take(request.page_size)
            .collect();

        Ok(EventPage {
            items,
            total_items: Some(total),
        })
    }

    async fn fetch_following(&self, _username: &str) -> Result<Vec<String>> {
        *self.following_calls.lock().unwrap() += 1;
        match &self.following {
            Some(names) => Ok(names.clone()),
            None => anyhow::bail!("GET /users/me/following/ timed out"),
        }
    }

    async fn react_to_post(&self, post_id: &str, reaction: Reaction) -> Result<()> {
        if self.fail_reactions {
            anyhow::bail!("POST /posts/{post_id}/{reaction}/ returned 500");
        }
        let key = match reaction {
            Reaction::Like => "like_count",
            Reaction::Dislike => "dislike_count",
        };
        let mut dataset = self.dataset.lock().unwrap();
        for raw in dataset.iter_mut() {
            if raw["id"] == post_id {
                let count = raw[key].as_u64().unwrap_or(0);
                raw[key] = json!(count + 1);
            }
        }
        Ok(())
    }
}

// ============================================================
// Helpers
// ============================================================

fn raw(id: &str, object_type: &str, verb: &str, actor_id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "object_type": object_type,
        "type": verb,
        "actor_id": actor_id,
        "actor_username": username,
    })
}

fn caller() -> Caller {
    Caller {
        user_id: "me".to_string(),
        username: "me_user".to_string(),
    }
}

fn profile(strategy: FetchStrategy, allow_list: AllowList) -> FeedProfile {
    FeedProfile {
        strategy,
        allow_list,
        page_size: 15,
        bulk_page_size: 1000,
        category_options: Vec::new(),
    }
}

fn engine(source: Arc<InMemorySource>, strategy: FetchStrategy, mode: FeedMode) -> FeedEngine {
    let source: Arc<dyn ActivitySource> = source;
    FeedEngine::new(
        source,
        caller(),
        profile(strategy, AllowList::unrestricted()),
        mode,
    )
}

fn ids(engine_events: &[ecofeed::activity::event::ActivityEvent]) -> Vec<String> {
    engine_events.iter().map(|e| e.id.clone()).collect()
}

/// A mixed dataset across several actors and every rule in the table.
fn mixed_dataset() -> Vec<Value> {
    let shapes = [
        ("Note", "Create"),
        ("UserWaste", "Create"),
        ("Note", "Update"),
        ("Comment", "Create"),
        ("Note", "Like"),
        ("Follow", "Follow"),
        ("Follow", "Undo"),
        ("Note", "Delete"),
        ("Comment", "Update"),
        ("Challenge", "Create"),
    ];
    let actors = [("1", "ana"), ("2", "bo"), ("3", "cy")];
    (0..45)
        .map(|i| {
            let (object_type, verb) = shapes[i % shapes.len()];
            let (actor_id, username) = actors[i % actors.len()];
            raw(&format!("ev{i:02}"), object_type, verb, actor_id, username)
        })
        .collect()
}

/// Walk every page of `query` and collect the ids in order.
async fn all_pages(engine: &FeedEngine, query: FeedQuery) -> Vec<String> {
    let mut view = engine.apply(query).await;
    let mut collected = ids(&view.events);
    while view.pagination.has_next() {
        view = engine.next_page().await.unwrap();
        collected.extend(ids(&view.events));
    }
    collected
}

// ============================================================
// Classification through the feed
// ============================================================

#[tokio::test]
async fn concrete_scenario_classifies_and_filters() {
    let source = Arc::new(InMemorySource::new(vec![
        raw("a", "Note", "Create", "me", "me_user"),
        raw("b", "UserWaste", "Create", "me", "me_user"),
        raw("c", "Follow", "Undo", "me", "me_user"),
    ]));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    let view = engine.load().await;
    let categories: Vec<Category> = view.events.iter().map(|e| e.category).collect();
    assert_eq!(
        categories,
        vec![Category::CreatePost, Category::CreateWaste, Category::UnfollowUser]
    );

    let view = engine
        .set_category(Some(CategoryFilter::Only(Category::CreatePost)))
        .await;
    assert_eq!(ids(&view.events), vec!["a"]);
}

#[tokio::test]
async fn unmatched_events_are_shown_as_other_not_dropped() {
    let source = Arc::new(InMemorySource::new(vec![
        raw("a", "Challenge", "Create", "me", "me_user"),
        raw("b", "Note", "Announce", "me", "me_user"),
    ]));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    let view = engine.load().await;
    assert_eq!(view.events.len(), 2);
    assert!(view.events.iter().all(|e| e.category == Category::Other));
    assert_eq!(view.classification_gaps, 2);
}

// ============================================================
// Filter-mode equivalence
// ============================================================

#[tokio::test]
async fn server_and_client_filtering_agree_for_every_category() {
    let source = Arc::new(
        InMemorySource::new(mixed_dataset()).following(Some(&["ana", "bo", "cy"])),
    );
    let server = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Following);
    let client = engine(source, FetchStrategy::ClientLocal, FeedMode::Following);

    for category in Category::ALL {
        let query = FeedQuery::new(FeedMode::Following)
            .with_category(Some(CategoryFilter::Only(category)));
        let from_server = all_pages(&server, query.clone()).await;
        let from_client = all_pages(&client, query).await;
        assert_eq!(from_server, from_client, "mismatch for {category}");
    }
}

#[tokio::test]
async fn server_and_client_filtering_agree_with_actor_and_allow_list() {
    let source = Arc::new(
        InMemorySource::new(mixed_dataset()).following(Some(&["ana", "bo", "cy"])),
    );
    let allow = AllowList::new(["Note", "UserWaste"]);
    let dyn_source: Arc<dyn ActivitySource> = source.clone();
    let server = FeedEngine::new(
        dyn_source.clone(),
        caller(),
        profile(FetchStrategy::ServerDelegated, allow.clone()),
        FeedMode::Following,
    );
    let client = FeedEngine::new(
        dyn_source,
        caller(),
        profile(FetchStrategy::ClientLocal, allow),
        FeedMode::Following,
    );

    let query = FeedQuery::new(FeedMode::Following).with_actor(Some("2".to_string()));
    let from_server = all_pages(&server, query.clone()).await;
    let from_client = all_pages(&client, query).await;
    assert!(!from_server.is_empty());
    assert_eq!(from_server, from_client);

    // Challenge events are outside the allow-list on both paths
    let unfiltered = all_pages(&client, FeedQuery::new(FeedMode::Following)).await;
    assert!(unfiltered.iter().all(|id| {
        let n: usize = id[2..].parse().unwrap();
        n % 10 != 9
    }));
}

#[tokio::test]
async fn grouped_filter_falls_back_to_client_local_on_server_profiles() {
    let source = Arc::new(InMemorySource::new(vec![
        raw("a", "Note", "Create", "me", "me_user"),
        raw("b", "Note", "Update", "me", "me_user"),
        raw("c", "Comment", "Create", "me", "me_user"),
        raw("d", "Note", "Delete", "me", "me_user"),
    ]));
    let engine = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Own);

    let view = engine.set_category(Some(CategoryFilter::Posts)).await;
    assert_eq!(ids(&view.events), vec!["a", "b", "d"]);

    let requests = source.requests.lock().unwrap();
    let last = requests.last().unwrap();
    assert_eq!(last.page_size, 1000);
    assert!(last.category.is_none());
}

// ============================================================
// Pagination through the engine
// ============================================================

#[tokio::test]
async fn twenty_events_make_two_pages_of_fifteen() {
    let dataset: Vec<Value> = (1..=20)
        .map(|i| raw(&format!("e{i:02}"), "Note", "Create", "me", "me_user"))
        .collect();
    for strategy in [FetchStrategy::ServerDelegated, FetchStrategy::ClientLocal] {
        let source = Arc::new(InMemorySource::new(dataset.clone()));
        let engine = engine(source, strategy, FeedMode::Own);

        let page1 = engine.load().await;
        assert_eq!(page1.pagination.total_pages(), 2);
        assert_eq!(page1.events.len(), 15);
        assert_eq!(page1.events[0].id, "e01");
        assert_eq!(page1.events[14].id, "e15");
        assert!(page1.pagination.has_next());
        assert!(!page1.pagination.has_previous());

        let page2 = engine.next_page().await.unwrap();
        assert_eq!(ids(&page2.events), vec!["e16", "e17", "e18", "e19", "e20"]);
        assert!(!page2.pagination.has_next());
        assert!(page2.pagination.has_previous());
    }
}

#[tokio::test]
async fn out_of_range_pages_are_no_ops() {
    let dataset = (1..=20)
        .map(|i| raw(&format!("e{i:02}"), "Note", "Create", "me", "me_user"))
        .collect();
    let source = Arc::new(InMemorySource::new(dataset));
    let engine = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Own);

    let before = engine.load().await;
    let fetches = source.request_count();

    assert!(engine.set_page(0).await.is_none());
    assert!(engine.set_page(3).await.is_none());
    assert!(engine.previous_page().await.is_none());

    assert_eq!(source.request_count(), fetches);
    assert_eq!(engine.view().await, before);

    engine.set_page(2).await.unwrap();
    assert!(engine.next_page().await.is_none());
    assert_eq!(engine.view().await.pagination.page(), 2);
}

#[tokio::test]
async fn filter_change_resets_to_first_page() {
    let dataset = (1..=20)
        .map(|i| raw(&format!("e{i:02}"), "Note", "Create", "me", "me_user"))
        .collect();
    let source = Arc::new(InMemorySource::new(dataset));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    engine.load().await;
    engine.set_page(2).await.unwrap();
    let view = engine.set_actor(Some("me".to_string())).await;
    assert_eq!(view.query.page, 1);
    assert_eq!(view.pagination.page(), 1);
}

#[tokio::test]
async fn page_past_the_end_loads_the_last_page() {
    let dataset: Vec<Value> = (1..=20)
        .map(|i| raw(&format!("e{i:02}"), "Note", "Create", "me", "me_user"))
        .collect();
    for strategy in [FetchStrategy::ServerDelegated, FetchStrategy::ClientLocal] {
        let source = Arc::new(InMemorySource::new(dataset.clone()));
        let engine = engine(source, strategy, FeedMode::Own);

        let view = engine.apply(FeedQuery::new(FeedMode::Own).with_page(5)).await;
        assert_eq!(view.pagination.page(), 2);
        assert_eq!(view.query.page, 2);
        assert_eq!(ids(&view.events), vec!["e16", "e17", "e18", "e19", "e20"]);
        assert!(view.empty.is_none());
    }
}

#[tokio::test]
async fn refresh_after_dataset_shrinks_clamps_to_remaining_pages() {
    let dataset = (1..=20)
        .map(|i| raw(&format!("e{i:02}"), "Note", "Create", "me", "me_user"))
        .collect();
    let source = Arc::new(InMemorySource::new(dataset));
    let engine = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Own);

    engine.load().await;
    engine.set_page(2).await.unwrap();
    source.dataset.lock().unwrap().truncate(10);

    let view = engine.refresh().await;
    assert_eq!(view.pagination.page(), 1);
    assert_eq!(view.pagination.total_pages(), 1);
    assert_eq!(view.query.page, 1);
    assert_eq!(view.events.len(), 10);
    assert!(view.empty.is_none());
}

// ============================================================
// Stale responses
// ============================================================

#[tokio::test]
async fn later_request_wins_when_earlier_resolves_last() {
    let (tx, rx) = oneshot::channel();
    let source = Arc::new(
        InMemorySource::new(vec![
            raw("post", "Note", "Create", "me", "me_user"),
            raw("waste", "UserWaste", "Create", "me", "me_user"),
        ])
        .gated(rx),
    );
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    let query_a = FeedQuery::new(FeedMode::Own)
        .with_category(Some(CategoryFilter::Only(Category::CreatePost)));
    let query_b = FeedQuery::new(FeedMode::Own)
        .with_category(Some(CategoryFilter::Only(Category::CreateWaste)));

    let (_, view_b) = tokio::join!(engine.apply(query_a), async {
        let view = engine.apply(query_b.clone()).await;
        tx.send(()).unwrap();
        view
    });

    assert_eq!(ids(&view_b.events), vec!["waste"]);

    let final_view = engine.view().await;
    assert_eq!(final_view.query, query_b);
    assert_eq!(ids(&final_view.events), vec!["waste"]);
    assert!(!final_view.loading);
}

#[tokio::test]
async fn refresh_in_flight_is_discarded_after_filter_change() {
    let (tx, rx) = oneshot::channel();
    let source = Arc::new(
        InMemorySource::new(vec![
            raw("post", "Note", "Create", "me", "me_user"),
            raw("comment", "Comment", "Create", "me", "me_user"),
        ])
        .gated(rx),
    );
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    tokio::join!(engine.refresh(), async {
        engine
            .set_category(Some(CategoryFilter::Only(Category::CreateComment)))
            .await;
        tx.send(()).unwrap();
    });

    assert_eq!(ids(&engine.view().await.events), vec!["comment"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_filter_changes_keep_both_dimensions() {
    let source = Arc::new(InMemorySource::new(mixed_dataset()));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    for _ in 0..20 {
        engine.set_mode(FeedMode::Own).await;
        let by_category = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .set_category(Some(CategoryFilter::Only(Category::CreatePost)))
                    .await
            })
        };
        let by_actor = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.set_actor(Some("me".to_string())).await })
        };
        by_category.await.unwrap();
        by_actor.await.unwrap();

        let query = engine.query().await;
        assert_eq!(
            query.filter.category,
            Some(CategoryFilter::Only(Category::CreatePost))
        );
        assert_eq!(query.filter.actor_id.as_deref(), Some("me"));
    }
}

// ============================================================
// Following mode
// ============================================================

#[tokio::test]
async fn empty_following_list_yields_empty_feed_without_fetching() {
    let source = Arc::new(InMemorySource::new(mixed_dataset()).following(Some(&[])));
    let engine = engine(source.clone(), FetchStrategy::ClientLocal, FeedMode::Following);

    let view = engine.load().await;
    assert!(view.events.is_empty());
    assert_eq!(view.empty, Some(EmptyReason::NoFollowing));
    assert!(view.error.is_none());
    assert_eq!(source.request_count(), 0);
}

#[tokio::test]
async fn following_failure_surfaces_error_without_global_fetch() {
    let source = Arc::new(InMemorySource::new(mixed_dataset()).following(None));
    let engine = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Following);

    let view = engine.load().await;
    assert!(view.events.is_empty());
    assert_eq!(
        view.error.as_ref().map(FeedError::target),
        Some(FetchTarget::Following)
    );
    assert!(view.empty.is_none());
    assert_eq!(source.request_count(), 0);
}

#[tokio::test]
async fn following_mode_only_shows_followed_accounts() {
    let source = Arc::new(InMemorySource::new(mixed_dataset()).following(Some(&["bo"])));
    let engine = engine(source.clone(), FetchStrategy::ClientLocal, FeedMode::Following);

    let view = engine.load().await;
    assert!(!view.events.is_empty());
    assert!(view
        .events
        .iter()
        .all(|e| e.actor_username.as_deref() == Some("bo")));
    assert_eq!(*source.following_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn switching_mode_resets_filters_and_page() {
    let source = Arc::new(InMemorySource::new(mixed_dataset()).following(Some(&["ana"])));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    engine
        .set_category(Some(CategoryFilter::Only(Category::CreatePost)))
        .await;
    let view = engine.set_mode(FeedMode::Following).await;
    assert_eq!(view.query, FeedQuery::new(FeedMode::Following));
    assert_eq!(view.pagination.page(), 1);
}

// ============================================================
// Errors
// ============================================================

#[tokio::test]
async fn fetch_failure_is_distinct_from_empty_and_recovers_on_refresh() {
    let source = Arc::new(InMemorySource::new(vec![raw("a", "Note", "Create", "me", "me_user")]));
    source.set_failing(true);
    let engine = engine(source.clone(), FetchStrategy::ServerDelegated, FeedMode::Own);

    let view = engine.load().await;
    assert!(view.events.is_empty());
    assert!(view.empty.is_none());
    assert_eq!(
        view.error.as_ref().map(FeedError::target),
        Some(FetchTarget::Events)
    );
    assert!(view.error.unwrap().to_string().contains("503"));

    source.set_failing(false);
    let view = engine.refresh().await;
    assert!(view.error.is_none());
    assert_eq!(ids(&view.events), vec!["a"]);
}

#[tokio::test]
async fn empty_result_is_not_an_error() {
    let source = Arc::new(InMemorySource::new(Vec::new()));
    let engine = engine(source, FetchStrategy::ServerDelegated, FeedMode::Own);

    let view = engine.load().await;
    assert!(view.error.is_none());
    assert_eq!(view.empty, Some(EmptyReason::NoEvents));
    assert_eq!(view.pagination.total_pages(), 1);
}

// ============================================================
// Reactions
// ============================================================

#[tokio::test]
async fn reaction_refetches_and_shows_server_counts() {
    let mut post = raw("p1", "Note", "Create", "me", "me_user");
    post["like_count"] = json!(2);
    let source = Arc::new(InMemorySource::new(vec![post]));
    let engine = engine(source.clone(), FetchStrategy::ClientLocal, FeedMode::Own);

    engine.load().await;
    let fetches = source.request_count();

    let view = engine.react("p1", Reaction::Like).await.unwrap();
    assert_eq!(source.request_count(), fetches + 1);
    let reactions = PostReactions::resolve(&view.events[0]).unwrap();
    assert_eq!(reactions.like_count, 3);
}

#[tokio::test]
async fn failed_reaction_leaves_feed_untouched() {
    let mut source = InMemorySource::new(vec![raw("p1", "Note", "Create", "me", "me_user")]);
    source.fail_reactions = true;
    let source = Arc::new(source);
    let engine = engine(source.clone(), FetchStrategy::ClientLocal, FeedMode::Own);

    let before = engine.load().await;
    let err = engine.react("p1", Reaction::Dislike).await.unwrap_err();
    assert_eq!(err.target(), FetchTarget::Reaction);
    assert_eq!(engine.view().await, before);
}

// ============================================================
// Dedupe
// ============================================================

#[tokio::test]
async fn duplicate_ids_in_a_batch_count_once() {
    let source = Arc::new(InMemorySource::new(vec![
        raw("a", "Note", "Create", "me", "me_user"),
        raw("a", "Note", "Create", "me", "me_user"),
        raw("b", "UserWaste", "Create", "me", "me_user"),
    ]));
    let engine = engine(source, FetchStrategy::ClientLocal, FeedMode::Own);

    let view = engine.load().await;
    assert_eq!(ids(&view.events), vec!["a", "b"]);
    assert_eq!(view.pagination.total(), 2);
    let unique: HashSet<String> = ids(&view.events).into_iter().collect();
    assert_eq!(unique.len(), view.events.len());
}
