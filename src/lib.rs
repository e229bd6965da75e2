//! # timeline-sync
//!
//! Cursor-paginated timelines kept in sync with a realtime event stream.
//!
//! The crate is organized like an Elm application:
//!
//! - [`domain`] - Items, cursors, pages and the ordered item set
//! - [`model`] - Pure reducers: timeline pagination and reconciliation,
//!   scroll-triggered loading, typing presence
//! - [`integration`] - The async runtime that executes model commands
//! - [`infrastructure`] - Fetchers, push sources, Nostr adapters, config and CLI
//!
//! ## Example
//!
//! ```rust
//! use timeline_sync::{
//!     domain::{order::TimelineKind, page::Page},
//!     model::timeline::{Command, Message, Timeline},
//!     test_helpers::numbered_messages,
//! };
//!
//! let mut timeline = Timeline::new(TimelineKind::Feed, 2);
//! let Command::FetchPage(request) = timeline.update(Message::InitialLoadRequested) else {
//!     unreachable!()
//! };
//!
//! // Run the fetch however you like, then report the result
//! let page = Page::from_items(numbered_messages(2), 2);
//! timeline.update(Message::PageLoaded { ticket: request.ticket, page });
//!
//! assert_eq!(timeline.items().ids(), vec!["m002", "m001"]);
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod integration;
pub mod model;
pub mod test_helpers;
pub mod utils;

pub use domain::{Cursor, CursorCodec, CursorToken, Item, OrderedItems, Page, TimelineKind};
pub use error::{DecodeError, FetchError};
pub use integration::{RuntimeOptions, TimelineHandle, TimelineSnapshot};
pub use model::{PushEvent, Timeline};

/// Result type used by the binary and process-level helpers
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
