//! Game-side text handling.
//!
//! This module contains:
//! - Per-dialect classification of raw console lines
//! - Message formatting with placeholder substitution

pub mod classifier;
pub mod formatter;

pub use classifier::Classifier;
pub use formatter::MessageFormatter;
