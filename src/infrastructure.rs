//! Infrastructure layer
//!
//! Everything that talks to the outside world:
//! - CLI argument processing
//! - Configuration files
//! - Page fetchers and push sources, including the Nostr adapters

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod nostr;
pub mod push;
