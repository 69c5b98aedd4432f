//! HTTP Basic authorization token.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::ApiError;
use crate::validation::ensure_not_empty;

/// Build the `Authorization` header value for `username` / `password`.
pub fn basic_token(username: &str, password: &str) -> Result<String, ApiError> {
    ensure_not_empty(username, "username")?;
    ensure_not_empty(password, "password")?;
    Ok(format!("Basic {}", BASE64.encode(format!("{username}:{password}"))))
}
