//! Error types surfaced over HTTP

mod types;

pub use types::{ApiError, ErrorResponse};
