//! Pagination state management for timeline
//!
//! This module follows the Elm Architecture pattern:
//! - State changes only through the `update` function
//! - All state transitions are explicitly defined as `Message` variants
//! - The module is self-contained and doesn't know about the item list

use strum::Display;

use crate::{domain::cursor::Cursor, error::FetchError};

/// Loading status of a timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum Status {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetching the first page
    Loading,
    /// Data is loaded and no fetch is running
    Ready,
    /// Fetching an older page
    LoadingMore,
    /// The first page could not be loaded
    Error,
}

impl Status {
    pub fn is_fetching(&self) -> bool {
        matches!(self, Status::Loading | Status::LoadingMore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Initial,
    More,
}

/// Identifies one fetch
///
/// A result is only accepted when its ticket equals the ticket in flight. A
/// refresh bumps the generation, which turns every older ticket stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub generation: u64,
    pub kind: FetchKind,
}

/// Messages that can be sent to update the pagination state
///
/// Following Elm conventions, messages are named in past tense
/// to indicate "what happened" rather than "what to do"
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A stored cursor was restored before the first load
    CursorRestored(Cursor),
    /// Loading the first page was started
    InitialLoadStarted,
    /// Loading an older page was started
    MoreLoadStarted,
    /// Everything was thrown away for a refresh
    Reset,
    /// The fetch in flight completed
    PageCompleted {
        next_cursor: Option<Cursor>,
        has_more: bool,
    },
    /// The fetch in flight failed
    FetchFailed(FetchError),
}

/// Manages the pagination state machine of a timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    status: Status,
    cursor: Option<Cursor>,
    has_more: bool,
    generation: u64,
    in_flight: Option<FetchTicket>,
    last_error: Option<FetchError>,
}

impl Pagination {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self {
            status: Status::Idle,
            cursor: None,
            has_more: true,
            generation: 0,
            in_flight: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn can_load_initial(&self) -> bool {
        self.status == Status::Idle
    }

    pub fn can_load_more(&self) -> bool {
        self.status == Status::Ready && self.has_more && self.in_flight.is_none()
    }

    /// Whether a result with this ticket may still be merged
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.in_flight == Some(ticket)
    }

    /// Update the pagination state based on a message
    ///
    /// This is the only way to modify the pagination state. Guards live with the
    /// caller (`can_load_initial`, `can_load_more`, `is_current`); the arms here
    /// apply the transition unconditionally.
    pub fn update(&mut self, message: Message) {
        match message {
            Message::CursorRestored(cursor) => {
                self.cursor = Some(cursor);
            }
            Message::InitialLoadStarted => {
                self.status = Status::Loading;
                self.last_error = None;
                self.in_flight = Some(FetchTicket {
                    generation: self.generation,
                    kind: FetchKind::Initial,
                });
            }
            Message::MoreLoadStarted => {
                self.status = Status::LoadingMore;
                self.last_error = None;
                self.in_flight = Some(FetchTicket {
                    generation: self.generation,
                    kind: FetchKind::More,
                });
            }
            Message::Reset => {
                self.generation += 1;
                self.status = Status::Idle;
                self.cursor = None;
                self.has_more = true;
                self.in_flight = None;
                self.last_error = None;
            }
            Message::PageCompleted {
                next_cursor,
                has_more,
            } => {
                if next_cursor.is_some() {
                    self.cursor = next_cursor;
                }
                self.has_more = has_more;
                self.in_flight = None;
                self.status = Status::Ready;
            }
            Message::FetchFailed(error) => {
                // A failed first page leaves nothing to show; a failed older
                // page leaves the loaded data valid.
                self.status = match self.in_flight.map(|ticket| ticket.kind) {
                    Some(FetchKind::More) => Status::Ready,
                    _ => Status::Error,
                };
                self.in_flight = None;
                self.last_error = Some(error);
            }
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_state_default() {
        let state = Pagination::new();
        assert_eq!(state.status(), Status::Idle);
        assert_eq!(state.cursor(), None);
        assert!(state.has_more());
        assert!(state.can_load_initial());
        assert!(!state.can_load_more());
    }

    #[test]
    fn test_initial_load_success() {
        let mut state = Pagination::new();

        state.update(Message::InitialLoadStarted);
        assert_eq!(state.status(), Status::Loading);
        let ticket = state.in_flight().expect("ticket issued");
        assert_eq!(ticket.kind, FetchKind::Initial);

        state.update(Message::PageCompleted {
            next_cursor: Some(Cursor::new(1000, "a")),
            has_more: true,
        });
        assert_eq!(state.status(), Status::Ready);
        assert_eq!(state.cursor(), Some(&Cursor::new(1000, "a")));
        assert!(state.can_load_more());
        assert!(!state.is_current(ticket));
    }

    #[test]
    fn test_initial_load_failure_goes_to_error() {
        let mut state = Pagination::new();

        state.update(Message::InitialLoadStarted);
        state.update(Message::FetchFailed(FetchError::Timeout));

        assert_eq!(state.status(), Status::Error);
        assert_eq!(state.last_error(), Some(&FetchError::Timeout));
        assert_eq!(state.in_flight(), None);
    }

    #[test]
    fn test_more_failure_returns_to_ready() {
        let mut state = Pagination::new();
        state.update(Message::InitialLoadStarted);
        state.update(Message::PageCompleted {
            next_cursor: Some(Cursor::new(1000, "a")),
            has_more: true,
        });

        state.update(Message::MoreLoadStarted);
        assert_eq!(state.status(), Status::LoadingMore);
        state.update(Message::FetchFailed(FetchError::Transport("reset".into())));

        assert_eq!(state.status(), Status::Ready);
        assert!(state.last_error().is_some());
        // The cursor did not move
        assert_eq!(state.cursor(), Some(&Cursor::new(1000, "a")));
    }

    #[test]
    fn test_reset_invalidates_tickets() {
        let mut state = Pagination::new();
        state.update(Message::InitialLoadStarted);
        let stale = state.in_flight().expect("ticket issued");

        state.update(Message::Reset);
        state.update(Message::InitialLoadStarted);

        assert!(!state.is_current(stale));
        assert_eq!(state.generation(), 1);
        assert_eq!(state.cursor(), None);
    }

    #[test]
    fn test_completion_without_cursor_keeps_previous() {
        let mut state = Pagination::new();
        state.update(Message::CursorRestored(Cursor::new(500, "z")));
        state.update(Message::InitialLoadStarted);

        state.update(Message::PageCompleted {
            next_cursor: None,
            has_more: false,
        });

        assert_eq!(state.cursor(), Some(&Cursor::new(500, "z")));
        assert!(!state.has_more());
        assert!(!state.can_load_more());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::LoadingMore.to_string(), "LoadingMore");
        assert!(Status::Loading.is_fetching());
        assert!(!Status::Error.is_fetching());
    }
}
