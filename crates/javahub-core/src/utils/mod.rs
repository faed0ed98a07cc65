//! Utility functions for string formatting.

pub mod format;

pub use format::{format_datetime, line_count, truncate_string};
