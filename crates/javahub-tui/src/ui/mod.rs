//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, title and status bars, overlays
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling
//! - `views`: per-tab content

pub mod input;
pub mod render;
pub mod styles;
pub mod views;
