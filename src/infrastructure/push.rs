//! Push sources: out-of-band event delivery
//!
//! A [`PushSource`] is a capability, not a transport. The timeline only needs
//! to subscribe and, on teardown, to unsubscribe; how the events travel is the
//! source's business.

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::model::timeline::reconcile::PushEvent;

const DEFAULT_BROADCAST_CAPACITY: usize = 256;

type UnsubscribeHook = Box<dyn FnOnce() + Send>;

/// A live subscription to a push source
///
/// Dropping the subscription unsubscribes, so a torn-down consumer can never
/// keep receiving events.
pub struct Subscription<T> {
    events: BoxStream<'static, PushEvent<T>>,
    on_unsubscribe: Option<UnsubscribeHook>,
}

impl<T> Subscription<T> {
    pub fn new(events: BoxStream<'static, PushEvent<T>>) -> Self {
        Self {
            events,
            on_unsubscribe: None,
        }
    }

    /// A subscription that never delivers anything
    pub fn empty() -> Self
    where
        T: Send + 'static,
    {
        Self::new(stream::pending().boxed())
    }

    /// Run `hook` when the subscription ends
    pub fn with_unsubscribe(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_unsubscribe = Some(Box::new(hook));
        self
    }

    /// The next event, or `None` once the source is gone
    pub async fn next(&mut self) -> Option<PushEvent<T>> {
        self.events.next().await
    }

    pub fn unsubscribe(mut self) {
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

pub trait PushSource<T>: Send + Sync + 'static {
    fn subscribe(&self) -> Subscription<T>;
}

/// An in-process push source over a tokio broadcast channel
///
/// Useful for tests and for wiring a timeline to events produced locally (for
/// example, optimistic inserts after sending a message).
#[derive(Debug, Clone)]
pub struct BroadcastSource<T> {
    sender: broadcast::Sender<PushEvent<T>>,
}

impl<T: Clone + Send + 'static> BroadcastSource<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Deliver an event to every subscriber; returns how many received it
    pub fn publish(&self, event: PushEvent<T>) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for BroadcastSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> PushSource<T> for BroadcastSource<T> {
    fn subscribe(&self) -> Subscription<T> {
        let receiver = self.sender.subscribe();
        let events = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Push subscriber lagged behind");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Subscription::new(events.boxed())
    }
}
