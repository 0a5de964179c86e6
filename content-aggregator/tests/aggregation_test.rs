mod common;

use common::{adapters, ids, init_tracing, item, Behavior, ScriptedSource};
use content_aggregator::{
    AggregatorError, ContentKind, FavoritesStore, FeedSession, MemoryBackend, OrderState, PageOutcome,
    SearchQuery, SessionSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn three_sources() -> Vec<Arc<ScriptedSource>> {
    vec![
        ScriptedSource::single(ContentKind::News, vec![item("news-1", "Rust 2.0 released")]),
        ScriptedSource::single(ContentKind::Movie, vec![item("movie-1", "Foo: The Movie")]),
        ScriptedSource::single(ContentKind::Social, vec![item("social-1", "@ferris")]),
    ]
}

async fn session_with(sources: &[Arc<ScriptedSource>], backend: Arc<MemoryBackend>) -> FeedSession {
    let mut session = FeedSession::new(adapters(sources), backend, SessionSettings::default());
    session.start().await;
    session
}

#[tokio::test]
async fn test_concatenation_order_without_query_or_order() {
    init_tracing();

    let mut session = session_with(&three_sources(), Arc::new(MemoryBackend::new())).await;
    let outcome = session.load_next_page().await;

    let report = outcome.report().expect("page should load");
    assert_eq!(ids(&report.items), ["news-1", "movie-1", "social-1"]);
    assert!(report.failures.is_empty());
    assert!(report.has_more);
}

#[tokio::test]
async fn test_stored_order_is_applied_then_unlisted_items_follow() {
    init_tracing();

    let backend = Arc::new(MemoryBackend::with_order(OrderState::new(vec![
        "social-1".to_string(),
        "news-1".to_string(),
    ])));
    let mut session = session_with(&three_sources(), backend).await;
    let outcome = session.load_next_page().await;

    assert_eq!(ids(&outcome.report().unwrap().items), ["social-1", "news-1", "movie-1"]);
}

#[tokio::test]
async fn test_query_filters_before_order() {
    init_tracing();

    let backend = Arc::new(MemoryBackend::with_order(OrderState::new(vec![
        "social-1".to_string(),
        "news-1".to_string(),
        "movie-1".to_string(),
    ])));
    let mut session = session_with(&three_sources(), backend).await;
    session.set_query(SearchQuery::from("foo"));
    let outcome = session.load_next_page().await;

    assert_eq!(ids(&outcome.report().unwrap().items), ["movie-1"]);
}

#[tokio::test]
async fn test_failing_source_degrades_to_remaining_kinds() {
    init_tracing();

    let sources = vec![
        ScriptedSource::new(ContentKind::News, Behavior::Fail),
        ScriptedSource::single(ContentKind::Movie, vec![item("movie-1", "Foo")]),
        ScriptedSource::single(ContentKind::Social, vec![item("social-1", "@ferris")]),
    ];
    let mut session = session_with(&sources, Arc::new(MemoryBackend::new())).await;
    let outcome = session.load_next_page().await;

    let report = outcome.report().unwrap();
    assert_eq!(ids(&report.items), ["movie-1", "social-1"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, ContentKind::News);
    assert!(matches!(report.failures[0].1, AggregatorError::SourceUnavailable { .. }));
    assert!(outcome.auth_rejected().is_empty());
    info!("Failing source degraded cleanly");
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_times_out_without_blocking_others() {
    init_tracing();

    let sources = vec![
        ScriptedSource::new(
            ContentKind::News,
            Behavior::Delay(Duration::from_secs(60), vec![]),
        ),
        ScriptedSource::single(ContentKind::Movie, vec![item("movie-1", "Foo")]),
        ScriptedSource::single(ContentKind::Social, vec![item("social-1", "@ferris")]),
    ];
    let settings = SessionSettings { source_timeout: Duration::from_millis(500), ..Default::default() };
    let mut session = FeedSession::new(adapters(&sources), Arc::new(MemoryBackend::new()), settings);

    let outcome = session.load_next_page().await;
    let report = outcome.report().unwrap();
    assert_eq!(ids(&report.items), ["movie-1", "social-1"]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].1.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_favoriting_twice_is_rejected() {
    init_tracing();

    let mut store = FavoritesStore::new(Arc::new(MemoryBackend::new()));
    let news = item("news-1", "Rust 2.0 released");

    store.add(&news).await.unwrap();
    let second = store.add(&news).await;
    assert!(matches!(second, Err(AggregatorError::AlreadyFavorited { ref content_id }) if content_id == "news-1"));

    let records = store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content_id, "news-1");
}

#[tokio::test]
async fn test_auth_rejection_is_reported_separately() {
    init_tracing();

    let sources = vec![
        ScriptedSource::new(ContentKind::News, Behavior::AuthFail),
        ScriptedSource::new(ContentKind::Movie, Behavior::Fail),
        ScriptedSource::single(ContentKind::Social, vec![item("social-1", "@ferris")]),
    ];
    let mut session = session_with(&sources, Arc::new(MemoryBackend::new())).await;
    let outcome = session.load_next_page().await;

    assert_eq!(outcome.auth_rejected(), vec![ContentKind::News]);
    assert_eq!(outcome.report().unwrap().failures.len(), 2);
}

#[tokio::test]
async fn test_ids_stay_unique_when_a_provider_repeats_items() {
    init_tracing();

    let repeated = vec![item("news-1", "same"), item("news-2", "other")];
    let sources = vec![ScriptedSource::new(
        ContentKind::News,
        Behavior::Pages(vec![
            content_aggregator::SourcePage::new(repeated.clone(), true),
            content_aggregator::SourcePage::new(repeated, true),
        ]),
    )];
    let mut session = session_with(&sources, Arc::new(MemoryBackend::new())).await;
    session.load_next_page().await;
    session.load_next_page().await;

    assert_eq!(ids(session.render()), ["news-1", "news-2"]);
}

#[tokio::test]
async fn test_superseded_page_is_discarded() {
    init_tracing();

    let sources = vec![ScriptedSource::new(
        ContentKind::Social,
        Behavior::Delay(Duration::from_millis(200), vec![]),
    )];
    let mut session = session_with(&sources, Arc::new(MemoryBackend::new())).await;
    let generation = session.generation();

    let bump = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        generation.bump();
    });

    let outcome = session.load_next_page().await;
    bump.await.unwrap();

    assert!(matches!(outcome, PageOutcome::Superseded { issued: 0, current: 1 }));
    assert!(session.render().is_empty());
    assert_eq!(session.cursor(ContentKind::Social).unwrap().page, 1);
}
