//! Terminal presentation helpers

pub mod progress;
pub mod styling;
