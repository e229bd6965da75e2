use std::time::Duration;

use pretty_assertions::assert_eq;

use timeline_sync::{
    domain::order::TimelineKind,
    integration::runtime::{RuntimeOptions, TimelineHandle},
    model::{
        scroll::ScrollPosition,
        timeline::{pagination::Status, Timeline},
    },
    test_helpers::{numbered_messages, BroadcastSource, ChatMessage, MemoryFetcher},
};

const NEAR_BOTTOM: ScrollPosition = ScrollPosition {
    offset: 950.0,
    viewport_len: 500.0,
    content_len: 1500.0,
};

const NEAR_TOP: ScrollPosition = ScrollPosition {
    offset: 20.0,
    viewport_len: 500.0,
    content_len: 1500.0,
};

async fn loaded(
    kind: TimelineKind,
    fetcher: &MemoryFetcher<ChatMessage>,
    source: &BroadcastSource<ChatMessage>,
) -> TimelineHandle<ChatMessage> {
    let handle = TimelineHandle::spawn(
        Timeline::new(kind, 20),
        fetcher.clone(),
        source,
        RuntimeOptions::default(),
    );
    handle.load_initial();
    handle
        .wait_until(|s| s.status == Status::Ready)
        .await
        .expect("runtime stopped");
    handle
}

#[tokio::test(start_paused = true)]
async fn test_two_crossings_within_debounce_fetch_once() {
    let fetcher = MemoryFetcher::new(numbered_messages(100));
    let source = BroadcastSource::new();
    let handle = loaded(TimelineKind::Feed, &fetcher, &source).await;
    assert_eq!(fetcher.calls(), 1);

    handle.scrolled(NEAR_BOTTOM);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.scrolled(NEAR_BOTTOM);

    // Still inside the window of the second crossing
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(fetcher.calls(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 2);
    let snapshot = handle
        .wait_until(|s| s.len() == 40)
        .await
        .expect("runtime stopped");
    assert_eq!(snapshot.status, Status::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_far_from_edge_does_nothing() {
    let fetcher = MemoryFetcher::new(numbered_messages(100));
    let source = BroadcastSource::new();
    let handle = loaded(TimelineKind::Feed, &fetcher, &source).await;

    // Near the top of a feed is the wrong edge
    handle.scrolled(NEAR_TOP);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_chat_loads_older_at_top() {
    let fetcher = MemoryFetcher::new(numbered_messages(30));
    let source = BroadcastSource::new();
    let handle = loaded(TimelineKind::Chat, &fetcher, &source).await;

    handle.scrolled(NEAR_TOP);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(fetcher.calls(), 2);
    let snapshot = handle
        .wait_until(|s| s.len() == 30)
        .await
        .expect("runtime stopped");
    assert_eq!(snapshot.ids().first(), Some(&"m001"));
}

#[tokio::test(start_paused = true)]
async fn test_scroll_during_fetch_is_suppressed() {
    let fetcher =
        MemoryFetcher::new(numbered_messages(100)).with_delay(Duration::from_millis(500));
    let source = BroadcastSource::new();
    let handle = loaded(TimelineKind::Feed, &fetcher, &source).await;

    handle.load_more();
    handle
        .wait_until(|s| s.status == Status::LoadingMore)
        .await
        .expect("runtime stopped");

    // The view keeps reporting the bottom while the page is on its way
    handle.scrolled(NEAR_BOTTOM);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.scrolled(NEAR_BOTTOM);

    handle
        .wait_until(|s| s.len() == 40)
        .await
        .expect("runtime stopped");
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(handle.snapshot().len(), 40);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_at_end_of_collection_does_not_fetch() {
    let fetcher = MemoryFetcher::new(numbered_messages(10));
    let source = BroadcastSource::new();
    let handle = loaded(TimelineKind::Feed, &fetcher, &source).await;
    assert!(!handle.snapshot().has_more);

    handle.scrolled(NEAR_BOTTOM);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(fetcher.calls(), 1);
}
