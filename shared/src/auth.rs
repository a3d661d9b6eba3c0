//! Bearer token authentication.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{Error, Result};

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. An empty token counts as absent.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let (scheme, token) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Check a presented token against the configured secret.
///
/// Both values are hashed first so the comparison takes the same time
/// regardless of where (or whether) the lengths differ.
pub fn validate_token(token: Option<&str>, secret: &str) -> Result<()> {
    let Some(token) = token else {
        warn!("Rejected call without bearer token");
        return Err(Error::Unauthorized("Missing bearer token".to_string()));
    };

    if constant_time_eq(&Sha256::digest(token), &Sha256::digest(secret)) {
        Ok(())
    } else {
        warn!("Rejected call with invalid bearer token");
        Err(Error::Unauthorized("Invalid bearer token".to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
