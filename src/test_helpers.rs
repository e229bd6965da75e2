//! Fixtures shared by unit tests, integration tests and benches

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use futures::future::BoxFuture;

use crate::{
    domain::{cursor::Cursor, item::Item, page::Page},
    error::FetchError,
    infrastructure::fetcher::PageFetcher,
};

pub use crate::infrastructure::push::BroadcastSource;

/// A minimal chat message keyed by send time in milliseconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sent_at: i64,
    pub content: String,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, sent_at: i64, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sent_at,
            content: content.into(),
        }
    }

    /// A message sent at `HH:MM` on a fixed day
    pub fn at(id: impl Into<String>, time: &str, content: impl Into<String>) -> Self {
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .unwrap_or_else(|e| panic!("invalid time {time:?}: {e}"));
        let sent_at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .map(|date| date.and_time(time).and_utc().timestamp_millis())
            .unwrap_or_default();
        Self::new(id, sent_at, content)
    }
}

impl Item for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        self.sent_at
    }
}

/// `count` messages with sort keys `1..=count`, newest first
pub fn numbered_messages(count: i64) -> Vec<ChatMessage> {
    (1..=count)
        .rev()
        .map(|n| ChatMessage::new(format!("m{n:03}"), n, format!("message {n}")))
        .collect()
}

/// An in-memory backend that pages like a server would
///
/// Clones share the same backing data, call log and failure queue.
#[derive(Debug, Clone)]
pub struct MemoryFetcher<T> {
    items: Arc<Mutex<Vec<T>>>,
    failures: Arc<Mutex<VecDeque<FetchError>>>,
    cursors: Arc<Mutex<Vec<Option<Cursor>>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl<T: Item> MemoryFetcher<T> {
    pub fn new(items: Vec<T>) -> Self {
        let fetcher = Self {
            items: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            cursors: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        };
        fetcher.extend(items);
        fetcher
    }

    /// Answer every fetch only after `delay` (tokio time)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cursors of every fetch so far, in call order
    pub fn cursors(&self) -> Vec<Option<Cursor>> {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make the next fetch fail with `error`
    pub fn fail_next(&self, error: FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Add an item to the backing collection
    pub fn push(&self, item: T) {
        self.extend([item]);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        let mut stored = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        stored.extend(items);
        stored.sort_by_key(|item| Reverse(item.key()));
    }

    fn page(&self, cursor: Option<&Cursor>, limit: usize) -> Page<T> {
        let stored = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let items: Vec<T> = stored
            .iter()
            .filter(|item| cursor.map_or(true, |cursor| cursor.is_after(&item.key())))
            .take(limit)
            .cloned()
            .collect();
        Page::from_items(items, limit)
    }
}

impl<T: Item> PageFetcher<T> for MemoryFetcher<T> {
    fn fetch_page(
        &self,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> BoxFuture<'static, Result<Page<T>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cursor.clone());

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let result = match failure {
            Some(error) => Err(error),
            None => Ok(self.page(cursor.as_ref(), limit)),
        };
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}
