//! Presentation layer: command-line maintenance commands.

/// Cache maintenance commands.
pub mod commands;

pub use commands::{StatusReport, format_bytes, run};
