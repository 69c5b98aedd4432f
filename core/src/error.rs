//! Error types for the NextCaller API client.
//!
//! # Design
//! Input problems are caught before any request leaves the process and land
//! in `Validation`. Responses with a status of 400 or above are classified by
//! `transport::classify_response` into `RateLimited` (429), `Format` (the
//! error body could not be parsed) or `BadResponse` (a parsed error
//! envelope). Nothing is retried internally.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::ErrorBody;

/// Errors returned by the NextCaller clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An argument was rejected before any network call was made.
    #[error("invalid parameter `{parameter}`: {message}")]
    Validation { parameter: String, message: String },

    /// The server answered with an error status whose body is not a
    /// recognizable error envelope.
    #[error("format error: HTTP {status}: {content}")]
    Format { status: u16, content: String },

    /// The server answered 429 Too Many Requests.
    #[error("rate limit exceeded{}: {content}", rate_limit_detail(.limit, .remaining, .reset))]
    RateLimited {
        /// `X-Rate-Limit-Limit`, requests allowed per second.
        limit: Option<u64>,
        /// `X-Rate-Limit-Remaining`.
        remaining: Option<u64>,
        /// `X-Rate-Limit-Reset` converted from unix seconds.
        reset: Option<DateTime<Utc>>,
        content: String,
    },

    /// The server answered with an error status and a parsed error envelope.
    ///
    /// Pagination failures, such as asking `get_platform_statistics` for a
    /// page past the end, arrive here as well; `error.code` identifies them.
    #[error("bad response: HTTP {status}\n{error}")]
    BadResponse {
        status: u16,
        error: ErrorBody,
        content: String,
    },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub(crate) fn validation(parameter: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Format { status, .. } | ApiError::BadResponse { status, .. } => Some(*status),
            ApiError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Raw body of the failed response, if there was one.
    pub fn content(&self) -> Option<&str> {
        match self {
            ApiError::Format { content, .. }
            | ApiError::RateLimited { content, .. }
            | ApiError::BadResponse { content, .. } => Some(content),
            _ => None,
        }
    }
}

fn rate_limit_detail(
    limit: &Option<u64>,
    remaining: &Option<u64>,
    reset: &Option<DateTime<Utc>>,
) -> String {
    let mut detail = String::new();
    if let Some(limit) = limit {
        detail.push_str(&format!("; current limit is {limit} per second"));
    }
    if let Some(remaining) = remaining {
        detail.push_str(&format!("; requests left: {remaining}"));
    }
    if let Some(reset) = reset {
        detail.push_str(&format!("; resets at {}", reset.to_rfc3339()));
    }
    detail
}
