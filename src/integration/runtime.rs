//! Async runtime for one timeline
//!
//! The reducers in [`crate::model`] never perform I/O. This module owns a
//! spawned task that feeds them: it runs page fetches, forwards push events,
//! drives the scroll and presence timers, and publishes a snapshot of the
//! state whenever a step changed it. Callers talk to the task through a
//! [`TimelineHandle`].

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::{future, FutureExt};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{cursor::CursorToken, item::Item, page::Page},
    error::FetchError,
    infrastructure::{
        fetcher::PageFetcher,
        push::{PushSource, Subscription},
    },
    model::{
        presence::{Message as PresenceMessage, PresenceSet, DEFAULT_SILENCE_WINDOW},
        scroll::{
            Decision, Message as ScrollMessage, ScrollPosition, ScrollTrigger, DEFAULT_DEBOUNCE,
            DEFAULT_THRESHOLD,
        },
        timeline::{
            pagination::{FetchTicket, Status},
            Command, Message, Timeline,
        },
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeOptions {
    pub scroll_threshold: f64,
    pub scroll_debounce: Duration,
    pub typing_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            scroll_threshold: DEFAULT_THRESHOLD,
            scroll_debounce: DEFAULT_DEBOUNCE,
            typing_timeout: DEFAULT_SILENCE_WINDOW,
        }
    }
}

/// What a view needs to render a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSnapshot<T> {
    pub items: Vec<T>,
    pub status: Status,
    pub has_more: bool,
    pub cursor: Option<CursorToken>,
    pub last_error: Option<FetchError>,
    /// Users currently typing, sorted by id
    pub typing: Vec<String>,
}

impl<T: Item> TimelineSnapshot<T> {
    fn capture(timeline: &Timeline<T>, presence: &PresenceSet) -> Self {
        Self {
            items: timeline.items().to_vec(),
            status: timeline.status(),
            has_more: timeline.has_more(),
            cursor: timeline.cursor_token(),
            last_error: timeline.last_error().cloned(),
            typing: presence.members(),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(Item::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
enum Request {
    LoadInitial,
    LoadMore,
    Refresh,
    Retry,
    Scrolled(ScrollPosition),
    TypingStarted(String),
    TypingStopped(String),
}

struct FetchOutcome<T> {
    ticket: FetchTicket,
    result: Result<Page<T>, FetchError>,
}

/// The model clock, read from tokio so paused-time tests stay deterministic
fn now() -> Instant {
    time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(time::Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}

struct Runtime<T, F> {
    timeline: Timeline<T>,
    trigger: ScrollTrigger,
    presence: PresenceSet,
    fetcher: F,
    fetch_task: Option<JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<FetchOutcome<T>>,
    snapshot_tx: watch::Sender<TimelineSnapshot<T>>,
    /// Timeline revision of the last published snapshot
    published: u64,
    /// Presence membership changed since the last publish
    presence_changed: bool,
}

impl<T: Item, F: PageFetcher<T>> Runtime<T, F> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut results: mpsc::UnboundedReceiver<FetchOutcome<T>>,
        mut subscription: Subscription<T>,
        cancel: CancellationToken,
    ) {
        let mut push_open = true;
        tracing::debug!(kind = %self.timeline.kind(), "Timeline runtime started");

        loop {
            let scroll_deadline = self.trigger.deadline();
            let presence_deadline = self.presence.next_deadline();

            tokio::select! {
                _ = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    // Every handle is gone
                    None => break,
                },
                Some(outcome) = results.recv() => self.handle_outcome(outcome),
                event = subscription.next(), if push_open => match event {
                    Some(event) => {
                        self.timeline.update(Message::EventReceived(event));
                    }
                    None => {
                        tracing::warn!("Push source closed, realtime updates stopped");
                        push_open = false;
                    }
                },
                _ = sleep_until(scroll_deadline) => self.handle_scroll_deadline(),
                _ = sleep_until(presence_deadline) => {
                    self.presence_changed |=
                        self.presence.update(PresenceMessage::Expired { now: now() });
                }
            }

            self.publish_if_changed();
        }

        self.teardown(subscription);
    }

    fn handle_request(&mut self, request: Request) {
        tracing::trace!(?request, "Handling request");
        let command = match request {
            Request::LoadInitial => self.timeline.update(Message::InitialLoadRequested),
            Request::LoadMore => self.timeline.update(Message::MoreRequested),
            Request::Refresh => {
                self.trigger.update(ScrollMessage::Cancelled);
                self.timeline.update(Message::RefreshRequested)
            }
            Request::Retry => self.timeline.update(Message::RetryRequested),
            Request::Scrolled(position) => {
                let decision = self.trigger.update(ScrollMessage::Scrolled {
                    position,
                    at: now(),
                    fetch_in_flight: self.timeline.is_fetching(),
                });
                if decision == Decision::Suppressed {
                    tracing::trace!("Scroll ignored while a fetch is running");
                }
                Command::None
            }
            Request::TypingStarted(user) => {
                self.presence_changed |=
                    self.presence.update(PresenceMessage::Started { user, at: now() });
                Command::None
            }
            Request::TypingStopped(user) => {
                self.presence_changed |= self.presence.update(PresenceMessage::Stopped { user });
                Command::None
            }
        };
        self.execute(command);
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome<T>) {
        let FetchOutcome { ticket, result } = outcome;
        let message = match result {
            Ok(page) => {
                tracing::debug!(?ticket, items = page.len(), "Page fetched");
                Message::PageLoaded { ticket, page }
            }
            Err(error) => {
                tracing::warn!(?ticket, "Page fetch failed: {error}");
                Message::PageFailed { ticket, error }
            }
        };
        let command = self.timeline.update(message);
        self.execute(command);
    }

    fn handle_scroll_deadline(&mut self) {
        let decision = self.trigger.update(ScrollMessage::DeadlineReached {
            at: now(),
            fetch_in_flight: self.timeline.is_fetching(),
        });
        if decision == Decision::Fire {
            tracing::debug!("Scroll settled near the edge, loading more");
            let command = self.timeline.update(Message::MoreRequested);
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        let Command::FetchPage(request) = command else {
            return;
        };

        // Only the newest fetch matters; a superseded one would be discarded anyway
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }

        let ticket = request.ticket;
        let fetch = self.fetcher.fetch_page(request.cursor, request.limit);
        let results_tx = self.results_tx.clone();
        self.fetch_task = Some(tokio::spawn(async move {
            let result = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(?ticket, "Page fetcher panicked");
                    Err(FetchError::Aborted)
                });
            // The runtime may already be gone
            let _ = results_tx.send(FetchOutcome { ticket, result });
        }));
    }

    /// Publish a snapshot unless nothing a view renders has changed
    fn publish_if_changed(&mut self) {
        let revision = self.timeline.revision();
        if revision == self.published && !self.presence_changed {
            return;
        }
        self.published = revision;
        self.presence_changed = false;
        self.snapshot_tx
            .send_replace(TimelineSnapshot::capture(&self.timeline, &self.presence));
    }

    fn teardown(mut self, subscription: Subscription<T>) {
        subscription.unsubscribe();
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        self.trigger.update(ScrollMessage::Cancelled);
        self.presence_changed |= self.presence.update(PresenceMessage::Cleared);
        self.publish_if_changed();
        tracing::debug!(kind = %self.timeline.kind(), "Timeline runtime stopped");
    }
}

/// A running timeline
///
/// Dropping the handle stops the runtime: the push subscription is released,
/// any fetch in flight is aborted and pending timers are cancelled.
pub struct TimelineHandle<T> {
    requests: mpsc::UnboundedSender<Request>,
    snapshot: watch::Receiver<TimelineSnapshot<T>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T: Item> TimelineHandle<T> {
    /// Subscribe to `source` and start driving `timeline`
    ///
    /// Must be called within a tokio runtime. Nothing is fetched until
    /// [`load_initial`](Self::load_initial) is called.
    pub fn spawn<F, S>(timeline: Timeline<T>, fetcher: F, source: &S, options: RuntimeOptions) -> Self
    where
        F: PageFetcher<T>,
        S: PushSource<T> + ?Sized,
    {
        let trigger = ScrollTrigger::for_kind(timeline.kind())
            .with_threshold(options.scroll_threshold)
            .with_debounce(options.scroll_debounce);
        let presence = PresenceSet::new(options.typing_timeout);
        let (snapshot_tx, snapshot) =
            watch::channel(TimelineSnapshot::capture(&timeline, &presence));
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let subscription = source.subscribe();
        let cancel = CancellationToken::new();

        let runtime = Runtime {
            published: timeline.revision(),
            timeline,
            trigger,
            presence,
            fetcher,
            fetch_task: None,
            results_tx,
            snapshot_tx,
            presence_changed: false,
        };
        let task = tokio::spawn(runtime.run(requests_rx, results_rx, subscription, cancel.clone()));

        Self {
            requests,
            snapshot,
            cancel,
            task: Some(task),
        }
    }

    fn send(&self, request: Request) {
        if let Err(e) = self.requests.send(request) {
            tracing::debug!("Timeline runtime is gone, dropping {:?}", e.0);
        }
    }

    /// Load the first page (only from the idle state)
    pub fn load_initial(&self) {
        self.send(Request::LoadInitial);
    }

    /// Load the next older page, if any
    pub fn load_more(&self) {
        self.send(Request::LoadMore);
    }

    /// Drop everything and load the first page again
    pub fn refresh(&self) {
        self.send(Request::Refresh);
    }

    /// Repeat the last failed fetch
    pub fn retry(&self) {
        self.send(Request::Retry);
    }

    /// Report a scroll sample from the view
    pub fn scrolled(&self, position: ScrollPosition) {
        self.send(Request::Scrolled(position));
    }

    pub fn typing_started(&self, user: impl Into<String>) {
        self.send(Request::TypingStarted(user.into()));
    }

    pub fn typing_stopped(&self, user: impl Into<String>) {
        self.send(Request::TypingStopped(user.into()));
    }

    /// The latest published state
    pub fn snapshot(&self) -> TimelineSnapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<TimelineSnapshot<T>> {
        self.snapshot.clone()
    }

    /// Wait until the published state satisfies `predicate`
    ///
    /// Returns `None` if the runtime stops first.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&TimelineSnapshot<T>) -> bool,
    ) -> Option<TimelineSnapshot<T>> {
        let mut receiver = self.snapshot.clone();
        let snapshot = receiver.wait_for(|snapshot| predicate(snapshot)).await;
        snapshot.ok().map(|snapshot| (*snapshot).clone())
    }

    /// Stop the runtime and wait for its teardown to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Timeline runtime ended abnormally: {e}");
            }
        }
    }
}

impl<T> Drop for TimelineHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
