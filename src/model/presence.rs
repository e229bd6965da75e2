//! Typing/presence membership
//!
//! A set of user ids that expire after a silence window. This is deliberately
//! separate from the timeline: membership has no order and never touches the
//! item list.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_millis(3000);

/// Messages that can be sent to update the presence set
///
/// Following Elm conventions, messages are named in past tense
pub enum Message {
    /// A user started typing (or joined); repeats refresh the deadline
    Started { user: String, at: Instant },
    /// A user explicitly stopped typing (or left)
    Stopped { user: String },
    /// Time moved on; evict everyone whose window passed
    Expired { now: Instant },
    /// Everyone left
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSet {
    silence_window: Duration,
    deadlines: BTreeMap<String, Instant>,
}

impl PresenceSet {
    pub fn new(silence_window: Duration) -> Self {
        Self {
            silence_window,
            deadlines: BTreeMap::new(),
        }
    }

    pub fn silence_window(&self) -> Duration {
        self.silence_window
    }

    pub fn contains(&self, user: &str) -> bool {
        self.deadlines.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Current members, sorted by id
    pub fn members(&self) -> Vec<String> {
        self.deadlines.keys().cloned().collect()
    }

    /// The earliest pending eviction
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Update the set and report whether membership changed
    pub fn update(&mut self, message: Message) -> bool {
        match message {
            Message::Started { user, at } => self
                .deadlines
                .insert(user, at + self.silence_window)
                .is_none(),
            Message::Stopped { user } => self.deadlines.remove(&user).is_some(),
            Message::Expired { now } => {
                let before = self.deadlines.len();
                self.deadlines.retain(|_, deadline| *deadline > now);
                before != self.deadlines.len()
            }
            Message::Cleared => {
                let changed = !self.deadlines.is_empty();
                self.deadlines.clear();
                changed
            }
        }
    }
}

impl Default for PresenceSet {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_WINDOW)
    }
}
