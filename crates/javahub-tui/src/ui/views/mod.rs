//! Content area of each tab.

pub mod compiler;
pub mod courses;
pub mod dashboard;
pub mod practice;
pub mod quiz;
pub mod topics;
