//! Integration layer
//!
//! Connects the pure models to fetchers, push sources and timers.

pub mod runtime;

pub use runtime::{RuntimeOptions, TimelineHandle, TimelineSnapshot};
