//! Executing requests and classifying responses.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. `UreqTransport` is the
//! production implementation; tests substitute a transport that returns
//! fixed responses. Whatever the transport, `classify_response` decides
//! whether a response is a success (status below 400) or which `ApiError`
//! it maps to.

use std::time::Duration;

use chrono::DateTime;
use tracing::{debug, warn};

use crate::auth::basic_token;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::ErrorEnvelope;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "X-Rate-Limit-Limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "X-Rate-Limit-Reset";

const JSON_CONTENT_TYPE: &str = "application/json";
const USER_AGENT: &str = concat!("nextcaller-rust/", env!("CARGO_PKG_VERSION"));

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Executes one HTTP round trip.
///
/// Implementations return every response that arrives, whatever its status;
/// `Err` is reserved for requests that produced no response at all.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport over `ureq`, authenticating every request with HTTP
/// Basic credentials.
pub struct UreqTransport {
    agent: ureq::Agent,
    authorization: String,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(username: &str, password: &str, timeout: Duration) -> Result<Self, ApiError> {
        let authorization = basic_token(username, password)?;
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Ok(Self { agent, authorization })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.username, &config.password, config.timeout)
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    authorization: &str,
    extra: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    builder = builder
        .header("Authorization", authorization)
        .header("Accept", JSON_CONTENT_TYPE)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .header("User-Agent", USER_AGENT);
    for (name, value) in extra {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let auth = self.authorization.as_str();
        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(&request.url), auth, &request.headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(&request.url), auth, &request.headers);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(&request.url), auth, &request.headers);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse { status, headers, body })
    }
}

/// Return the body of a successful response, or the error it represents.
pub fn classify_response(response: &HttpResponse) -> Result<&str, ApiError> {
    if response.is_success() {
        return Ok(&response.body);
    }

    if response.status == HTTP_TOO_MANY_REQUESTS {
        let error = ApiError::RateLimited {
            limit: numeric_header(response, RATE_LIMIT_LIMIT_HEADER),
            remaining: numeric_header(response, RATE_LIMIT_REMAINING_HEADER),
            reset: numeric_header(response, RATE_LIMIT_RESET_HEADER)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            content: response.body.clone(),
        };
        warn!(%error, "request was rate limited");
        return Err(error);
    }

    let error = match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => ApiError::BadResponse {
            status: response.status,
            error: envelope.error,
            content: response.body.clone(),
        },
        Err(_) => ApiError::Format {
            status: response.status,
            content: response.body.clone(),
        },
    };
    warn!(status = response.status, "request failed");
    Err(error)
}

fn numeric_header(response: &HttpResponse, name: &str) -> Option<u64> {
    response.header(name).and_then(|value| value.trim().parse().ok())
}

/// In-memory transport that records requests and replays queued responses.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MockTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub(crate) fn returning(status: u16, body: &str) -> Self {
            let mock = Self::default();
            mock.push(HttpResponse::new(status, body));
            mock
        }

        pub(crate) fn push(&self, response: HttpResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::Transport("no response queued".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_returns_body() {
        let response = HttpResponse::new(200, r#"{"records":[]}"#);
        assert_eq!(classify_response(&response).unwrap(), r#"{"records":[]}"#);
    }

    #[test]
    fn no_content_is_success() {
        let response = HttpResponse::new(204, "");
        assert_eq!(classify_response(&response).unwrap(), "");
    }

    #[test]
    fn too_many_requests_reads_rate_limit_headers() {
        let response = HttpResponse::new(429, "Too many requests")
            .with_header("X-Rate-Limit-Limit", "10")
            .with_header("x-rate-limit-remaining", "0")
            .with_header("X-Rate-Limit-Reset", "1700000000");
        match classify_response(&response).unwrap_err() {
            ApiError::RateLimited {
                limit,
                remaining,
                reset,
                content,
            } => {
                assert_eq!(limit, Some(10));
                assert_eq!(remaining, Some(0));
                assert_eq!(reset.unwrap().timestamp(), 1_700_000_000);
                assert_eq!(content, "Too many requests");
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn too_many_requests_without_headers() {
        let response = HttpResponse::new(429, r#"{"error": {"message": "slow down"}}"#)
            .with_header("X-Rate-Limit-Limit", "lots");
        let err = classify_response(&response).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RateLimited {
                limit: None,
                remaining: None,
                reset: None,
                ..
            }
        ));
    }

    #[test]
    fn error_envelope_becomes_bad_response() {
        let body = r#"{"error": {"message": "No profile found", "code": "555", "type": "Not Found"}}"#;
        let response = HttpResponse::new(404, body);
        match classify_response(&response).unwrap_err() {
            ApiError::BadResponse { status, error, content } => {
                assert_eq!(status, 404);
                assert_eq!(error.message.as_deref(), Some("No profile found"));
                assert_eq!(error.code.as_deref(), Some("555"));
                assert_eq!(content, body);
            }
            other => panic!("expected BadResponse, got {other:?}"),
        }
    }

    #[test]
    fn server_error_with_envelope_is_bad_response() {
        let response = HttpResponse::new(500, r#"{"error": {"message": "boom", "code": 500}}"#);
        assert!(matches!(
            classify_response(&response).unwrap_err(),
            ApiError::BadResponse { status: 500, .. }
        ));
    }

    #[test]
    fn unparseable_body_is_format_error() {
        let response = HttpResponse::new(502, "<html>Bad Gateway</html>");
        assert!(matches!(
            classify_response(&response).unwrap_err(),
            ApiError::Format { status: 502, .. }
        ));
    }

    #[test]
    fn json_without_error_key_is_format_error() {
        let response = HttpResponse::new(400, r#"{"detail": "nope"}"#);
        assert!(matches!(
            classify_response(&response).unwrap_err(),
            ApiError::Format { status: 400, .. }
        ));
    }

    #[test]
    fn ureq_transport_requires_credentials() {
        let err = UreqTransport::new("", "secret", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
