//! Shared helpers

pub mod fs;
pub mod rate_limit;
pub mod time;
