//! Runtime wiring: the authority loop and the state shared with HTTP handlers

pub mod authority;
pub mod state;

pub use authority::{Authority, ConsoleRequest};
pub use state::{AppState, StatusBoard};
