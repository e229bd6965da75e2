//! Pure state machines
//!
//! Every model here follows the same shape: state changes only through an
//! `update` function that takes a message, and anything time-dependent gets the
//! current instant passed in.

pub mod presence;
pub mod scroll;
pub mod timeline;

pub use presence::PresenceSet;
pub use scroll::{ScrollPosition, ScrollTrigger};
pub use timeline::{
    pagination::{FetchKind, FetchTicket, Status},
    reconcile::PushEvent,
    Command, FetchRequest, Timeline,
};
