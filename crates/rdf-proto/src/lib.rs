//! Core of the RDF bridge: everything that decides which channel a backend
//! update belongs to and who is currently transmitting.
//!
//! The crate is runtime-agnostic.  All entry points are synchronous and expect
//! to be called from whichever task delivers the event; shared state is guarded
//! internally.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod draw;
pub mod error;
pub mod frequency;
pub mod geo;
pub mod host;
pub mod platform;
pub mod protocol;
pub mod relay;
pub mod resolver;
pub mod settings;
pub mod style;
pub mod sync;
pub mod tracker;

#[cfg(test)]
mod testlog;

pub use error::{RdfError, Result};
pub use frequency::Frequency;
pub use geo::GeoPosition;

/// tracing target for user-facing notices (the chat-line equivalent).
pub const NOTICE_TARGET: &str = "notice";
