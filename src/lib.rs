//! Eventpix - on-device image cache for event photo galleries.
//!
//! This crate resolves remote photo URLs to displayable references, keeping
//! downloaded copies in a local directory behind a bounded memory index, and
//! ships a small CLI for inspecting and maintaining that cache.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the cache and its adapters.
pub mod infrastructure;
/// Presentation layer containing CLI commands.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "eventpix";
