//! Timeline model
//!
//! A `Timeline` owns the ordered item list of one screen and coordinates its two
//! children: the pagination state machine and the realtime reconciler. It is a
//! plain reducer. Callers feed it messages and execute the commands it returns;
//! it never performs I/O, so every interleaving of fetch results and push
//! events can be replayed in a unit test.

pub mod pagination;
pub mod reconcile;

use crate::{
    domain::{
        collections::{Merge, OrderedItems},
        cursor::{Cursor, CursorCodec, CursorToken},
        item::Item,
        order::TimelineKind,
        page::Page,
    },
    error::FetchError,
    model::timeline::{
        pagination::{FetchKind, FetchTicket, Message as PaginationMessage, Pagination, Status},
        reconcile::{reconcile, PushEvent},
    },
};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Messages that can be sent to update the timeline
pub enum Message<T> {
    /// The first page was requested (valid only while idle)
    InitialLoadRequested,
    /// An older page was requested
    MoreRequested,
    /// A full reload was requested
    RefreshRequested,
    /// The last failed fetch should be tried again
    RetryRequested,
    /// A fetch completed
    PageLoaded { ticket: FetchTicket, page: Page<T> },
    /// A fetch failed
    PageFailed {
        ticket: FetchTicket,
        error: FetchError,
    },
    /// The push source delivered an event
    EventReceived(PushEvent<T>),
}

/// A page fetch the owner of the timeline has to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub cursor: Option<Cursor>,
    pub limit: usize,
}

/// Side effects requested by [`Timeline::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    FetchPage(FetchRequest),
}

impl Command {
    pub fn fetch_request(&self) -> Option<&FetchRequest> {
        match self {
            Command::FetchPage(request) => Some(request),
            Command::None => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timeline<T> {
    kind: TimelineKind,
    limit: usize,
    items: OrderedItems<T>,
    pagination: Pagination,
    revision: u64,
}

impl<T: Item> Timeline<T> {
    pub fn new(kind: TimelineKind, limit: usize) -> Self {
        Self {
            kind,
            limit: limit.max(1),
            items: OrderedItems::new(kind.order()),
            pagination: Pagination::new(),
            revision: 0,
        }
    }

    /// Create a timeline that starts paging after a stored cursor token
    ///
    /// An unreadable token is dropped and the timeline starts from the first
    /// page instead.
    pub fn resume(kind: TimelineKind, limit: usize, token: &str) -> Self {
        let mut timeline = Self::new(kind, limit);
        if let Some(cursor) = CursorCodec::decode_or_restart(token) {
            timeline
                .pagination
                .update(PaginationMessage::CursorRestored(cursor));
        }
        timeline
    }

    pub fn kind(&self) -> TimelineKind {
        self.kind
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn items(&self) -> &OrderedItems<T> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn status(&self) -> Status {
        self.pagination.status()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.pagination.cursor()
    }

    /// The cursor in its storable form
    pub fn cursor_token(&self) -> Option<CursorToken> {
        self.cursor().map(CursorCodec::encode)
    }

    pub fn has_more(&self) -> bool {
        self.pagination.has_more()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.pagination.last_error()
    }

    pub fn is_fetching(&self) -> bool {
        self.pagination.in_flight().is_some()
    }

    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.pagination.in_flight()
    }

    /// Bumped on every change to the items or the pagination state
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn update(&mut self, message: Message<T>) -> Command {
        match message {
            Message::InitialLoadRequested => {
                if !self.pagination.can_load_initial() {
                    log::debug!(
                        "Ignoring initial load request in status {}",
                        self.status()
                    );
                    return Command::None;
                }
                self.start_fetch(PaginationMessage::InitialLoadStarted)
            }
            Message::MoreRequested => {
                if !self.pagination.can_load_more() {
                    log::trace!(
                        "Ignoring load more request (status: {}, has_more: {})",
                        self.status(),
                        self.has_more()
                    );
                    return Command::None;
                }
                self.start_fetch(PaginationMessage::MoreLoadStarted)
            }
            Message::RefreshRequested => {
                if let Some(ticket) = self.in_flight() {
                    log::debug!("Refresh supersedes fetch {ticket:?}");
                }
                self.items.clear();
                self.pagination.update(PaginationMessage::Reset);
                self.start_fetch(PaginationMessage::InitialLoadStarted)
            }
            Message::RetryRequested => match self.status() {
                Status::Error => self.start_fetch(PaginationMessage::InitialLoadStarted),
                Status::Ready if self.last_error().is_some() => {
                    self.update(Message::MoreRequested)
                }
                _ => Command::None,
            },
            Message::PageLoaded { ticket, page } => {
                if !self.pagination.is_current(ticket) {
                    log::debug!("Discarding stale page for {ticket:?}");
                    return Command::None;
                }

                let (items, next_cursor, has_more) = page.into_parts();
                let has_more = has_more && !items.is_empty();
                let next_cursor = next_cursor.or_else(|| items.last().map(Cursor::from_item));
                let added = self.items.merge_all(items);
                log::debug!(
                    "Merged {added} new items ({:?} page), {} total",
                    ticket.kind,
                    self.items.len()
                );

                self.pagination.update(PaginationMessage::PageCompleted {
                    next_cursor,
                    has_more,
                });
                self.revision += 1;
                Command::None
            }
            Message::PageFailed { ticket, error } => {
                if !self.pagination.is_current(ticket) {
                    log::debug!("Discarding stale failure for {ticket:?}: {error}");
                    return Command::None;
                }
                match ticket.kind {
                    FetchKind::Initial => log::error!("Failed to load first page: {error}"),
                    FetchKind::More => log::warn!("Failed to load more items: {error}"),
                }
                self.pagination
                    .update(PaginationMessage::FetchFailed(error));
                self.revision += 1;
                Command::None
            }
            Message::EventReceived(event) => {
                let merge = reconcile(&mut self.items, event);
                if let Merge::Inserted(index) = merge {
                    log::trace!("Realtime item inserted at {index}");
                }
                if merge.is_changed() {
                    self.revision += 1;
                }
                Command::None
            }
        }
    }

    fn start_fetch(&mut self, started: PaginationMessage) -> Command {
        self.pagination.update(started);
        self.revision += 1;
        match self.pagination.in_flight() {
            Some(ticket) => Command::FetchPage(FetchRequest {
                ticket,
                cursor: self.pagination.cursor().cloned(),
                limit: self.limit,
            }),
            None => Command::None,
        }
    }
}
