//! Bearer-token check for the manual broadcast endpoint

use crate::error::{RelayError, Result};

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Check an Authorization header against the configured broadcast token.
/// Without a configured token every request is allowed.
pub fn authorize(expected: Option<&str>, auth_header: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match auth_header.and_then(extract_bearer_token) {
        Some(token) if constant_time_eq(token, expected) => Ok(()),
        _ => Err(RelayError::Unauthorized),
    }
}
