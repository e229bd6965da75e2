//! Scroll-driven load trigger
//!
//! Turns a continuous scroll signal into discrete "load more" decisions.
//! Time is passed in with every message, so the debounce logic stays a pure
//! state machine; the runtime owns the actual timer.

use std::time::{Duration, Instant};

use crate::domain::order::{Edge, TimelineKind};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_THRESHOLD: f64 = 200.0;

/// A scroll sample, in whatever unit the view measures (rows, pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top
    pub offset: f64,
    /// Visible length
    pub viewport_len: f64,
    /// Total content length
    pub content_len: f64,
}

impl ScrollPosition {
    pub fn new(offset: f64, viewport_len: f64, content_len: f64) -> Self {
        Self {
            offset,
            viewport_len,
            content_len,
        }
    }

    pub fn distance_to(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Top => self.offset.max(0.0),
            Edge::Bottom => (self.content_len - self.viewport_len - self.offset).max(0.0),
        }
    }
}

/// Messages that can be sent to update the trigger
pub enum Message {
    /// The view scrolled
    Scrolled {
        position: ScrollPosition,
        at: Instant,
        fetch_in_flight: bool,
    },
    /// The armed deadline may have passed
    DeadlineReached { at: Instant, fetch_in_flight: bool },
    /// Any armed deadline should be dropped
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do
    Ignored,
    /// A load is pending until the deadline
    Armed { deadline: Instant },
    /// A load was due but a fetch is already running
    Suppressed,
    /// Load more now
    Fire,
}

/// Debounced trigger for loading older items
///
/// A sample within `threshold` of the load edge is a crossing. Each crossing
/// (re)arms a deadline `debounce` ahead and the trigger fires once when the
/// deadline passes without further crossings. A running fetch suppresses both
/// arming and firing.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    edge: Edge,
    threshold: f64,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl ScrollTrigger {
    pub fn new(edge: Edge, threshold: f64, debounce: Duration) -> Self {
        Self {
            edge,
            threshold,
            debounce,
            deadline: None,
        }
    }

    pub fn for_kind(kind: TimelineKind) -> Self {
        Self::new(kind.load_edge(), DEFAULT_THRESHOLD, DEFAULT_DEBOUNCE)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn update(&mut self, message: Message) -> Decision {
        match message {
            Message::Scrolled {
                position,
                at,
                fetch_in_flight,
            } => {
                if fetch_in_flight {
                    return Decision::Suppressed;
                }
                if position.distance_to(self.edge) > self.threshold {
                    return Decision::Ignored;
                }
                let deadline = at + self.debounce;
                self.deadline = Some(deadline);
                Decision::Armed { deadline }
            }
            Message::DeadlineReached {
                at,
                fetch_in_flight,
            } => match self.deadline {
                None => Decision::Ignored,
                Some(deadline) if at < deadline => Decision::Armed { deadline },
                Some(_) => {
                    self.deadline = None;
                    if fetch_in_flight {
                        Decision::Suppressed
                    } else {
                        Decision::Fire
                    }
                }
            },
            Message::Cancelled => {
                self.deadline = None;
                Decision::Ignored
            }
        }
    }
}
