mod common;

use common::init_tracing;
use content_aggregator::SearchDebouncer;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test(start_paused = true)]
async fn test_rapid_keystrokes_settle_once() {
    init_tracing();

    let (debouncer, mut settled) = SearchDebouncer::spawn(QUIET);
    for partial in ["r", "ru", "rus", "rust"] {
        debouncer.push(partial);
        sleep(Duration::from_millis(50)).await;
    }

    let query = settled.recv().await.unwrap();
    assert_eq!(query.as_str(), "rust");
    assert!(timeout(Duration::from_secs(5), settled.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_separate_pauses_emit_separately_and_skip_repeats() {
    init_tracing();

    let (debouncer, mut settled) = SearchDebouncer::spawn(QUIET);

    debouncer.push("tokio");
    sleep(Duration::from_millis(400)).await;
    assert_eq!(settled.recv().await.unwrap().as_str(), "tokio");

    // Typing and deleting back to the same text does not re-emit.
    debouncer.push("tokio-");
    debouncer.push("tokio");
    sleep(Duration::from_millis(400)).await;

    debouncer.push("");
    sleep(Duration::from_millis(400)).await;
    assert_eq!(settled.recv().await.unwrap().as_str(), "");
}

#[tokio::test(start_paused = true)]
async fn test_close_flushes_pending_input() {
    init_tracing();

    let (debouncer, mut settled) = SearchDebouncer::spawn(QUIET);
    debouncer.push("serde");
    debouncer.close().await;

    assert_eq!(settled.recv().await.unwrap().as_str(), "serde");
    assert!(settled.recv().await.is_none());
}
