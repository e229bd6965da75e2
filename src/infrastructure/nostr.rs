//! Nostr relays as a timeline backend
//!
//! Relays page with `until`/`limit` filters and push live events over the same
//! connection. Both are adapted here to [`PageFetcher`] and [`PushSource`].

use std::time::Duration;

use futures::{future::BoxFuture, stream, StreamExt};
use nostr_sdk::prelude::*;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{cursor::Cursor, item::Item, order::TimelineKind, page::Page},
    error::FetchError,
    infrastructure::{
        fetcher::PageFetcher,
        push::{PushSource, Subscription},
    },
    model::timeline::reconcile::PushEvent,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A Nostr event shown in a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    id: String,
    event: Event,
}

impl Note {
    pub fn new(event: Event) -> Self {
        Self {
            id: event.id.to_hex(),
            event,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn author(&self) -> PublicKey {
        self.event.pubkey
    }

    pub fn content(&self) -> &str {
        &self.event.content
    }

    pub fn created_at(&self) -> Timestamp {
        self.event.created_at
    }
}

impl Item for Note {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        i64::try_from(self.event.created_at.as_u64()).unwrap_or(i64::MAX)
    }
}

/// Filter for pages of a timeline
///
/// A feed shows text notes (optionally from the given authors); a chat shows
/// the messages of one public channel.
pub fn page_filter(kind: TimelineKind, authors: &[PublicKey], channel: Option<EventId>) -> Filter {
    let filter = match (kind, channel) {
        (TimelineKind::Chat, Some(channel)) => Filter::new().kind(Kind::ChannelMessage).event(channel),
        (TimelineKind::Chat, None) => Filter::new().kind(Kind::ChannelMessage),
        (TimelineKind::Feed, _) => Filter::new().kind(Kind::TextNote),
    };

    if authors.is_empty() {
        filter
    } else {
        filter.authors(authors.iter().copied())
    }
}

/// Filter for live events: anything new matching the page filter, plus
/// deletions from the same authors
pub fn push_filter(kind: TimelineKind, authors: &[PublicKey], channel: Option<EventId>) -> Filter {
    let kinds = match kind {
        TimelineKind::Feed => [Kind::TextNote, Kind::EventDeletion],
        TimelineKind::Chat => [Kind::ChannelMessage, Kind::EventDeletion],
    };
    let filter = Filter::new().kinds(kinds).since(Timestamp::now());
    let filter = match channel {
        Some(channel) if kind == TimelineKind::Chat => filter.event(channel),
        _ => filter,
    };

    if authors.is_empty() {
        filter
    } else {
        filter.authors(authors.iter().copied())
    }
}

/// Turn a relay response into a page
///
/// `until` is inclusive on relays, so everything at or after the cursor is
/// dropped here. Whether more pages exist is judged on the raw response size.
pub fn page_from_events(events: Vec<Event>, cursor: Option<&Cursor>, limit: usize) -> Page<Note> {
    let fetched = events.len();
    let mut notes: Vec<Note> = events
        .into_iter()
        .map(Note::new)
        .filter(|note| cursor.map_or(true, |cursor| cursor.is_after(&note.key())))
        .collect();
    notes.sort_by(|a, b| b.key().cmp(&a.key()));

    let next_cursor = notes
        .last()
        .map(Cursor::from_item)
        .or_else(|| cursor.cloned());
    Page::new(notes, next_cursor, limit > 0 && fetched >= limit)
}

/// The `until` to retry with when a page came back empty but full
///
/// A full raw page that filters down to nothing means at least `limit` events
/// share the cursor's second, and asking again with the same `until` returns
/// the same batch. The retry starts one second earlier; the rest of that
/// second is skipped.
pub fn stepped_until(until: u64, page: &Page<Note>) -> Option<u64> {
    (page.is_empty() && page.has_more())
        .then(|| until.checked_sub(1))
        .flatten()
}

/// Map a live relay event to timeline events
pub fn push_events(event: Event) -> Vec<PushEvent<Note>> {
    if event.kind == Kind::EventDeletion {
        return event
            .tags
            .filter_standardized(TagKind::SingleLetter(SingleLetterTag::lowercase(
                Alphabet::E,
            )))
            .filter_map(|tag| match tag {
                TagStandard::Event { event_id, .. } => Some(PushEvent::Delete(event_id.to_hex())),
                _ => None,
            })
            .collect();
    }

    vec![PushEvent::Insert(Note::new(event))]
}

#[derive(Clone)]
pub struct NostrPageFetcher {
    client: Client,
    filter: Filter,
    timeout: Duration,
}

impl NostrPageFetcher {
    pub fn new(client: Client, filter: Filter) -> Self {
        Self {
            client,
            filter,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl PageFetcher<Note> for NostrPageFetcher {
    fn fetch_page(
        &self,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> BoxFuture<'static, Result<Page<Note>, FetchError>> {
        let client = self.client.clone();
        let timeout = self.timeout;
        let filter = self.filter.clone().limit(limit);
        let mut until = cursor
            .as_ref()
            .map(|cursor| u64::try_from(cursor.sort_key).unwrap_or_default());

        Box::pin(async move {
            loop {
                let filter = match until {
                    Some(until) => filter.clone().until(Timestamp::from(until)),
                    None => filter.clone(),
                };
                let events = client
                    .fetch_events(filter, timeout)
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                let events: Vec<Event> = events.into_iter().collect();
                tracing::debug!(count = events.len(), ?cursor, ?until, "Fetched events from relays");

                let page = page_from_events(events, cursor.as_ref(), limit);
                match until.and_then(|until| stepped_until(until, &page)) {
                    Some(earlier) => {
                        tracing::warn!(
                            until = earlier,
                            "Full page at the cursor timestamp, stepping back one second"
                        );
                        until = Some(earlier);
                    }
                    None => return Ok(page),
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct NostrPushSource {
    client: Client,
    filter: Filter,
}

impl NostrPushSource {
    pub fn new(client: Client, filter: Filter) -> Self {
        Self { client, filter }
    }

    /// Forward relay notifications for one subscription until cancelled
    async fn run_subscription_loop(
        client: Client,
        filter: Filter,
        events_tx: mpsc::UnboundedSender<PushEvent<Note>>,
        cancel: CancellationToken,
    ) {
        let mut notifications = client.notifications();
        let subscription_id = match client.subscribe(filter, None).await {
            Ok(output) => output.val,
            Err(e) => {
                tracing::error!("Failed to subscribe to relays: {e}");
                return;
            }
        };
        tracing::info!(%subscription_id, "Subscribed to relays");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                notification = notifications.recv() => {
                    match notification {
                        Ok(RelayPoolNotification::Event { subscription_id: id, event, .. })
                            if id == subscription_id =>
                        {
                            let delivered = push_events(*event)
                                .into_iter()
                                .all(|push| events_tx.send(push).is_ok());
                            if !delivered {
                                // Receiver dropped
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Relay notifications lagged behind");
                        }
                        Err(RecvError::Closed) => {
                            tracing::warn!("Relay notification channel closed");
                            break;
                        }
                    }
                }
            }
        }

        let _ = client.unsubscribe(&subscription_id).await;
        tracing::info!(%subscription_id, "Unsubscribed from relays");
    }
}

impl PushSource<Note> for NostrPushSource {
    fn subscribe(&self) -> Subscription<Note> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(Self::run_subscription_loop(
            self.client.clone(),
            self.filter.clone(),
            events_tx,
            cancel.clone(),
        ));

        let events = stream::unfold(events_rx, |mut rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        });
        Subscription::new(events.boxed()).with_unsubscribe(move || cancel.cancel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_note(keys: &Keys, content: &str, timestamp: u64) -> Event {
        EventBuilder::text_note(content)
            .custom_created_at(Timestamp::from(timestamp))
            .sign_with_keys(keys)
            .expect("Failed to create test event")
    }

    #[test]
    fn test_note_item() {
        let keys = Keys::generate();
        let event = text_note(&keys, "hello", 1_700_000_000);

        let note = Note::new(event.clone());

        assert_eq!(note.id(), event.id.to_hex());
        assert_eq!(note.sort_key(), 1_700_000_000);
        assert_eq!(note.content(), "hello");
        assert_eq!(note.author(), keys.public_key());
    }

    #[test]
    fn test_page_from_events_sorts_newest_first() {
        let keys = Keys::generate();
        let events = vec![
            text_note(&keys, "b", 2000),
            text_note(&keys, "c", 3000),
            text_note(&keys, "a", 1000),
        ];

        let page = page_from_events(events, None, 3);

        let contents: Vec<_> = page.items().iter().map(Note::content).collect();
        assert_eq!(contents, vec!["c", "b", "a"]);
        assert!(page.has_more());
        assert_eq!(page.next_cursor().map(|c| c.sort_key), Some(1000));
    }

    #[test]
    fn test_page_from_events_drops_inclusive_boundary() {
        let keys = Keys::generate();
        let boundary = Note::new(text_note(&keys, "boundary", 2000));
        let cursor = Cursor::from_item(&boundary);
        let events = vec![boundary.event().clone(), text_note(&keys, "older", 1000)];

        let page = page_from_events(events, Some(&cursor), 2);

        let contents: Vec<_> = page.items().iter().map(Note::content).collect();
        assert_eq!(contents, vec!["older"]);
        // The relay returned a full page, so there may be more
        assert!(page.has_more());
    }

    #[test]
    fn test_page_from_events_empty_keeps_cursor() {
        let cursor = Cursor::new(1000, "x");

        let page = page_from_events(vec![], Some(&cursor), 20);

        assert!(page.is_empty());
        assert!(!page.has_more());
        assert_eq!(page.next_cursor(), Some(&cursor));
    }

    #[test]
    fn test_full_page_at_cursor_second_steps_back() {
        let keys = Keys::generate();
        let events: Vec<Event> = (0..3)
            .map(|n| text_note(&keys, &format!("same second {n}"), 2000))
            .collect();
        // Every event in that second sorts at or after the cursor
        let cursor = Cursor::new(2000, "");

        let page = page_from_events(events, Some(&cursor), 3);

        assert!(page.is_empty());
        assert_eq!(stepped_until(2000, &page), Some(1999));
    }

    #[test]
    fn test_stepped_until_keeps_partial_and_non_empty_pages() {
        let keys = Keys::generate();
        let cursor = Cursor::new(2000, "");

        let partial = page_from_events(vec![text_note(&keys, "x", 2000)], Some(&cursor), 3);
        assert_eq!(stepped_until(2000, &partial), None);

        let events = vec![text_note(&keys, "a", 2000), text_note(&keys, "b", 1500)];
        let mixed = page_from_events(events, Some(&cursor), 2);
        assert_eq!(mixed.len(), 1);
        assert_eq!(stepped_until(2000, &mixed), None);

        let empty_full = Page::new(Vec::new(), Some(Cursor::new(0, "")), true);
        assert_eq!(stepped_until(0, &empty_full), None);
    }

    #[test]
    fn test_push_events_text_note_is_insert() {
        let keys = Keys::generate();
        let event = text_note(&keys, "live", 1000);

        let pushed = push_events(event.clone());

        assert_eq!(pushed, vec![PushEvent::Insert(Note::new(event))]);
    }

    #[test]
    fn test_filters_by_kind() {
        let feed = page_filter(TimelineKind::Feed, &[], None);
        let chat = page_filter(TimelineKind::Chat, &[], Some(EventId::all_zeros()));

        assert!(feed.kinds.as_ref().is_some_and(|k| k.contains(&Kind::TextNote)));
        assert!(chat
            .kinds
            .as_ref()
            .is_some_and(|k| k.contains(&Kind::ChannelMessage)));
    }
}
