//! Synchronous client for the NextCaller identity and fraud lookup API.
//!
//! # Overview
//! `NextCallerClient` looks up consumer profiles by phone, email, profile id
//! or name and address, reports fraud levels, and posts profile updates.
//! `PlatformClient` performs the same lookups on behalf of a platform account
//! and manages those accounts.
//!
//! # Design
//! - Each operation is split into `build_*` (validate input, produce an
//!   `HttpRequest`) and `parse_*` (classify and deserialize an
//!   `HttpResponse`). Invalid input is rejected before any network call.
//! - `Transport` performs the round trip. `UreqTransport` is the default;
//!   tests plug in transports that return fixed payloads.
//! - `transport::classify_response` maps error statuses to typed `ApiError`
//!   variants (rate limit, unparseable body, parsed error envelope).
//! - Entities mirror the API's JSON one-to-one.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod platform;
pub mod transport;
pub mod types;
pub mod validation;

pub use client::NextCallerClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use platform::PlatformClient;
pub use transport::{classify_response, Transport, UreqTransport};
pub use types::{
    Address, AnalyzeCallData, ErrorBody, FraudLevel, NameAddress, Phone, PlatformAccount, PlatformAccountUpdate,
    PlatformStatistics, Profile, ProfileList, ProfileUpdate, Relative,
};
