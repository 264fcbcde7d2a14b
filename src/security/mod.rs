//! Security utilities for the HTTP surface

pub mod auth;
pub mod headers;

pub use auth::{authorize, constant_time_eq, extract_bearer_token};
pub use headers::with_api_security_headers;
