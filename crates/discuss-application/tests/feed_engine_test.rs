mod common;

use common::Harness;
use discuss_application::{FetchOutcome, ScrollLoader, SkipReason, ViewportMetrics};
use discuss_core::DiscussError;
use discuss_core::feed::{FeedFilters, FilterChange, SortBy, TimeWindow};
use discuss_core::user::{LoginPayload, UserProfile};
use discuss_interaction::mock::post_list;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const ALL: &str = "/api/posts/all";
const SAVED: &str = "/api/posts/saved";

#[tokio::test]
async fn test_full_page_then_short_page() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 20));
    harness.executor.push_json(ALL, 200, post_list(21, 5));
    let engine = harness.feed("all", FeedFilters::default()).await;

    let first = engine.fetch_next_page().await.expect("First page should load");
    assert_eq!(first, FetchOutcome::Appended { offset: 0, count: 20 });
    assert!(engine.state().has_next_page);

    let second = engine.fetch_next_page().await.expect("Second page should load");
    assert_eq!(second, FetchOutcome::Appended { offset: 1, count: 5 });

    let state = engine.state();
    assert!(!state.has_next_page);
    assert!(!state.is_fetching);
    assert_eq!(state.total_posts(), 25);
    assert_eq!(state.pages.len(), 2);

    let offsets: Vec<_> = harness
        .executor
        .requests_to(ALL)
        .iter()
        .map(|r| r.query_value("offset").unwrap_or_default().to_string())
        .collect();
    assert_eq!(offsets, vec!["0", "20"]);

    let third = engine.fetch_next_page().await.unwrap();
    assert_eq!(third, FetchOutcome::Skipped(SkipReason::Exhausted));
    assert_eq!(harness.executor.call_count(ALL), 2);
}

#[tokio::test]
async fn test_requests_carry_filters() {
    let harness = Harness::new();
    harness.executor.push_json("/api/posts/thread/rust", 200, post_list(1, 2));
    let engine = harness
        .feed("posts/thread/rust", FeedFilters::new(SortBy::Hot, TimeWindow::Month))
        .await;

    engine.fetch_next_page().await.unwrap();

    let request = &harness.executor.requests()[0];
    assert_eq!(request.path, "/api/posts/thread/rust");
    assert_eq!(request.query_value("limit"), Some("20"));
    assert_eq!(request.query_value("sortby"), Some("hot"));
    assert_eq!(request.query_value("duration"), Some("month"));
}

#[tokio::test]
async fn test_empty_first_page_is_empty_result() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 0));
    let engine = harness.feed("home", FeedFilters::default()).await;

    engine.fetch_next_page().await.unwrap();

    let state = engine.state();
    assert!(state.is_empty_result());
    assert!(!state.has_next_page);
}

#[tokio::test]
async fn test_saved_feed_unauthorized_requires_login() {
    let harness = Harness::new();
    harness.executor.push("/api/posts/saved", 401, "unauthorized");
    let engine = harness.feed("saved", FeedFilters::default()).await;

    let outcome = engine.fetch_next_page().await.expect("Saved feed should not error");
    assert_eq!(outcome, FetchOutcome::AuthRequired);

    let state = engine.state();
    assert!(state.auth_required);
    assert!(state.error.is_none());
    assert!(!state.has_next_page);
    assert_eq!(state.total_posts(), 0);
    assert_eq!(harness.executor.call_count("/api/posts/saved"), 1, "401 must not be retried");
}

#[tokio::test]
async fn test_unauthorized_on_public_feed_is_an_error() {
    let harness = Harness::new();
    harness.executor.push("/api/posts/user/ada", 401, "");
    let engine = harness.feed("user/ada", FeedFilters::default()).await;

    let err = engine.fetch_next_page().await.unwrap_err();
    assert!(err.is_unauthorized());

    let state = engine.state();
    assert!(!state.auth_required);
    assert_eq!(state.error, Some(DiscussError::unauthorized("/api/posts/user/ada")));
    assert!(!state.has_next_page);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_retried_with_backoff() {
    let harness = Harness::new();
    for _ in 0..3 {
        harness.executor.push(ALL, 500, "internal");
    }
    let engine = harness.feed("all", FeedFilters::default()).await;

    let start = Instant::now();
    let err = engine.fetch_next_page().await.unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err, DiscussError::request_failed(500, "internal"));
    assert_eq!(harness.executor.call_count(ALL), 3);
    // 1000 ms before the first retry, 2000 ms before the second.
    assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");

    let state = engine.state();
    assert_eq!(state.error, Some(DiscussError::request_failed(500, "internal")));
    assert!(!state.is_fetching);
    assert_eq!(
        engine.fetch_next_page().await.unwrap(),
        FetchOutcome::Skipped(SkipReason::Errored)
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_recovers() {
    let harness = Harness::new();
    harness.executor.push_network_error(ALL);
    harness.executor.push_json(ALL, 200, post_list(1, 4));
    let engine = harness.feed("all", FeedFilters::default()).await;

    let outcome = engine.fetch_next_page().await.expect("Retry should succeed");

    assert_eq!(outcome, FetchOutcome::Appended { offset: 0, count: 4 });
    assert_eq!(harness.executor.call_count(ALL), 2);
    assert!(engine.state().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_filter_change_drops_in_flight_result() {
    let harness = Harness::new();
    harness
        .executor
        .push_delayed(ALL, Duration::from_millis(100), 200, post_list(1, 20).to_string());
    harness.executor.push_json(ALL, 200, post_list(100, 3));
    let engine = harness.feed("all", FeedFilters::default()).await;

    let slow = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_next_page().await }
    });
    let mut updates = engine.subscribe();
    updates
        .wait_for(|state| state.is_fetching)
        .await
        .expect("Fetch should start");

    assert!(engine.change_filter(FilterChange::SortBy(SortBy::New)));
    let state = engine.state();
    assert!(state.pages.is_empty());
    assert_eq!(state.next_offset(), 0);
    assert!(!state.is_fetching);

    let fresh = engine.fetch_next_page().await.unwrap();
    assert_eq!(fresh, FetchOutcome::Appended { offset: 0, count: 3 });

    let stale = slow.await.expect("Task should not panic").unwrap();
    assert_eq!(stale, FetchOutcome::Stale);

    let state = engine.state();
    assert_eq!(state.key.sort_by, SortBy::New);
    assert_eq!(state.total_posts(), 3);
    assert_eq!(state.posts().next().map(|p| p.id()), Some(100));

    let sorts: Vec<_> = harness
        .executor
        .requests_to(ALL)
        .iter()
        .map(|r| r.query_value("sortby").unwrap_or_default().to_string())
        .collect();
    assert_eq!(sorts, vec!["top", "new"]);
}

#[tokio::test]
async fn test_same_engine_does_not_fetch_twice() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 20));
    let engine = harness.feed("all", FeedFilters::default()).await;

    let (a, b) = tokio::join!(engine.fetch_next_page(), engine.fetch_next_page());
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, FetchOutcome::Skipped(_)));

    assert_eq!(outcomes[0], FetchOutcome::Appended { offset: 0, count: 20 });
    assert_eq!(outcomes[1], FetchOutcome::Skipped(SkipReason::InFlight));
    assert_eq!(harness.executor.call_count(ALL), 1);
}

#[tokio::test(start_paused = true)]
async fn test_filter_round_trip_during_fetch_loads_a_fresh_page() {
    let harness = Harness::new();
    harness
        .executor
        .push_delayed(ALL, Duration::from_millis(100), 200, post_list(1, 20).to_string());
    harness.executor.push_json(ALL, 200, post_list(100, 3));
    let engine = harness.feed("all", FeedFilters::default()).await;

    let slow = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_next_page().await }
    });
    let mut updates = engine.subscribe();
    updates
        .wait_for(|state| state.is_fetching)
        .await
        .expect("Fetch should start");

    assert!(engine.change_filter(FilterChange::SortBy(SortBy::New)));
    assert!(engine.change_filter(FilterChange::SortBy(SortBy::Top)));

    // Same key as the request still running; waits for it, then fetches.
    let fresh = engine.fetch_next_page().await.expect("Fresh page should load");
    assert_eq!(fresh, FetchOutcome::Appended { offset: 0, count: 3 });

    let stale = slow.await.expect("Task should not panic").unwrap();
    assert_eq!(stale, FetchOutcome::Stale);

    let state = engine.state();
    assert!(!state.is_fetching);
    assert_eq!(state.total_posts(), 3);
    assert_eq!(state.posts().next().map(|p| p.id()), Some(100));
    assert_eq!(harness.executor.call_count(ALL), 2);
}

#[tokio::test(start_paused = true)]
async fn test_filter_change_during_backoff_stops_retrying() {
    let harness = Harness::new();
    harness.executor.push(ALL, 500, "internal");
    let engine = harness.feed("all", FeedFilters::default()).await;

    let pending = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_next_page().await }
    });
    // Inside the 1000 ms wait before the first retry.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(harness.executor.call_count(ALL), 1);
    assert!(engine.change_filter(FilterChange::Window(TimeWindow::Week)));

    let outcome = pending.await.expect("Task should not panic").unwrap();
    assert_eq!(outcome, FetchOutcome::Stale);
    assert_eq!(harness.executor.call_count(ALL), 1);

    let state = engine.state();
    assert_eq!(state.key.window, TimeWindow::Week);
    assert!(state.error.is_none());
    assert!(!state.is_fetching);
}

#[tokio::test]
async fn test_engines_sharing_a_key_share_one_fetch() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 20));
    let first = harness.feed("all", FeedFilters::default()).await;
    let second = harness.feed("home", FeedFilters::default()).await;
    let third = harness.feed("all", FeedFilters::default()).await;

    let (a, b) = tokio::join!(first.fetch_page(0), third.fetch_page(0));

    let appended = FetchOutcome::Appended { offset: 0, count: 20 };
    assert_eq!(a.expect("First engine should load"), appended);
    assert_eq!(b.expect("Third engine should reuse the page"), appended);
    assert_eq!(harness.executor.call_count(ALL), 1);
    assert_eq!(first.state().pages, third.state().pages);
    assert!(!third.state().is_fetching);
    // `home` is a different key even though it shares the backend path.
    assert_ne!(first.key(), second.key());
}

#[tokio::test(start_paused = true)]
async fn test_shared_fetch_failure_falls_back_to_own_fetch() {
    let harness = Harness::new();
    harness
        .executor
        .push_delayed("/api/posts/thread/7", Duration::from_millis(100), 404, "");
    harness.executor.push_json("/api/posts/thread/7", 200, post_list(1, 6));
    let first = harness.feed("thread/7", FeedFilters::default()).await;
    let second = harness.feed("thread/7", FeedFilters::default()).await;

    let failing = tokio::spawn({
        let first = first.clone();
        async move { first.fetch_page(0).await }
    });
    let mut updates = first.subscribe();
    updates
        .wait_for(|state| state.is_fetching)
        .await
        .expect("First fetch should start");

    let outcome = second.fetch_page(0).await.expect("Second engine should fetch on its own");
    assert_eq!(outcome, FetchOutcome::Appended { offset: 0, count: 6 });

    let failed = failing.await.expect("Task should not panic");
    assert!(failed.unwrap_err().is_not_found());
    assert_eq!(harness.executor.call_count("/api/posts/thread/7"), 2);
}

#[tokio::test]
async fn test_login_refetches_refused_saved_feed() {
    let harness = Harness::new();
    harness.executor.push(SAVED, 401, "unauthorized");
    harness.executor.push_json(SAVED, 200, post_list(1, 2));
    let session = harness.session();
    session.initialize();
    let engine = harness.feed("saved", FeedFilters::default()).await;

    assert_eq!(engine.fetch_next_page().await.unwrap(), FetchOutcome::AuthRequired);
    assert_eq!(
        engine.retry().await.unwrap(),
        FetchOutcome::Skipped(SkipReason::LoginRequired)
    );

    let payload = LoginPayload::new(UserProfile::new(7, "ada")).with_token("abc");
    session.login(Some(payload)).await.expect("Login should succeed");
    let outcome = engine
        .sync_with_session(&session.snapshot())
        .await
        .expect("Refetch should succeed");

    assert_eq!(outcome, Some(FetchOutcome::Appended { offset: 0, count: 2 }));
    let state = engine.state();
    assert!(!state.auth_required);
    assert_eq!(state.total_posts(), 2);
    let requests = harness.executor.requests_to(SAVED);
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].bearer.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_home_feed_waits_for_a_session() {
    let harness = Harness::new();
    let session = harness.session();
    let engine = harness.feed("home", FeedFilters::default()).await;

    // Startup check not done yet: nothing is decided.
    assert_eq!(engine.sync_with_session(&session.snapshot()).await.unwrap(), None);
    assert!(!engine.state().auth_required);

    session.initialize();
    let outcome = engine.sync_with_session(&session.snapshot()).await.unwrap();
    assert_eq!(outcome, Some(FetchOutcome::AuthRequired));
    assert!(engine.state().auth_required);
    assert_eq!(
        engine.fetch_next_page().await.unwrap(),
        FetchOutcome::Skipped(SkipReason::LoginRequired)
    );
    assert_eq!(engine.sync_with_session(&session.snapshot()).await.unwrap(), None);
    assert!(harness.executor.requests().is_empty());
}

#[tokio::test]
async fn test_public_feed_ignores_anonymous_session() {
    let harness = Harness::new();
    let session = harness.session();
    session.initialize();
    let engine = harness.feed("all", FeedFilters::default()).await;

    assert_eq!(engine.sync_with_session(&session.snapshot()).await.unwrap(), None);
    assert!(!engine.state().auth_required);
    assert!(engine.state().has_next_page);
}

#[tokio::test]
async fn test_followed_session_gates_and_releases_saved_feed() {
    let harness = Harness::new();
    harness.executor.push_json(SAVED, 200, post_list(1, 2));
    let session = harness.session();
    session.initialize();
    let engine = harness.feed("saved", FeedFilters::default()).await;
    let mut updates = engine.subscribe();

    let follower = engine.follow_session(session.subscribe());
    updates
        .wait_for(|state| state.auth_required)
        .await
        .expect("Anonymous session should gate the feed");
    assert_eq!(harness.executor.call_count(SAVED), 0);

    let payload = LoginPayload::new(UserProfile::new(7, "ada")).with_token("abc");
    session.login(Some(payload)).await.expect("Login should succeed");
    updates
        .wait_for(|state| state.total_posts() == 2)
        .await
        .expect("Login should refetch the feed");
    assert!(!engine.state().auth_required);

    session.logout().await;
    updates
        .wait_for(|state| state.auth_required && state.pages.is_empty())
        .await
        .expect("Logout should gate the feed again");
    assert_eq!(harness.executor.call_count(SAVED), 1);

    follower.abort();
}

#[tokio::test]
async fn test_fresh_cache_seeds_new_engine() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 20));
    let engine = harness.feed("all", FeedFilters::default()).await;
    engine.fetch_next_page().await.unwrap();

    let reopened = harness.feed("all", FeedFilters::default()).await;
    let state = reopened.state();
    assert_eq!(state.total_posts(), 20);
    assert_eq!(state.next_offset(), 1);
    assert!(state.has_next_page);

    let other_filters = harness
        .feed("all", FeedFilters::new(SortBy::Hot, TimeWindow::AllTime))
        .await;
    assert_eq!(other_filters.state().total_posts(), 0);

    harness.cache.invalidate_all().await;
    let after_invalidate = harness.feed("all", FeedFilters::default()).await;
    assert_eq!(after_invalidate.state().total_posts(), 0);
    assert_eq!(harness.executor.call_count(ALL), 1);
}

#[tokio::test]
async fn test_scroll_loader_pages_until_exhausted() {
    let harness = Harness::new();
    harness.executor.push_json(ALL, 200, post_list(1, 20));
    harness.executor.push_json(ALL, 200, post_list(21, 20));
    harness.executor.push_json(ALL, 200, post_list(41, 5));
    let engine = harness.feed("all", FeedFilters::default()).await;
    let loader = ScrollLoader::new(engine.clone());

    let (tx, rx) = mpsc::channel(8);
    // Far from the bottom: ignored.
    tx.send(ViewportMetrics::new(0.0, 10_000.0, 800.0)).await.unwrap();
    for _ in 0..5 {
        tx.send(ViewportMetrics::new(9_000.0, 10_000.0, 800.0)).await.unwrap();
    }
    drop(tx);

    let appended = loader.run(rx).await;

    assert_eq!(appended, 3);
    assert_eq!(engine.state().total_posts(), 45);
    assert!(!engine.state().has_next_page);
    assert_eq!(harness.executor.call_count(ALL), 3);
}
