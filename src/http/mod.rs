//! HTTP surface of the headless server

pub mod routes;

pub use routes::{build_router, AppError};
