//! Profile and fraud lookups against the NextCaller API.
//!
//! # Design
//! Every operation is split into a `build_*` method that validates input and
//! produces an `HttpRequest`, and a `parse_*` method that classifies an
//! `HttpResponse` and deserializes it. The convenience methods run one after
//! the other through the client's `Transport`, so invalid input never
//! reaches the network.
//!
//! The `*_json` variants stop after classification and hand back the raw
//! success body, for callers that keep their own entity types. The raw update
//! variants post a caller-serialized body unchanged.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{classify_response, Transport, UreqTransport};
use crate::types::{AnalyzeCallData, FraudLevel, NameAddress, Profile, ProfileList, ProfileUpdate};
use crate::validation::{ensure_not_empty, validate_name_address, validate_phone};

pub(crate) const RECORDS_PATH: &str = "records";
pub(crate) const USERS_PATH: &str = "users";
pub(crate) const FRAUD_PATH: &str = "fraud";
pub(crate) const ANALYZE_CALL_PATH: &str = "fraud/analyze";

pub(crate) const FORMAT_PARAM: (&str, &str) = ("format", "json");

/// Synchronous client for the NextCaller profile and fraud API.
#[derive(Debug, Clone)]
pub struct NextCallerClient<T = UreqTransport> {
    api_url: String,
    transport: T,
}

impl NextCallerClient<UreqTransport> {
    /// Create a client that talks HTTP through `ureq`. Fails when the
    /// username or password is empty.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(config, UreqTransport::from_config(config)?))
    }
}

impl<T: Transport> NextCallerClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            api_url: config.api_url(),
            transport,
        }
    }

    /// Versioned API root every request URL starts with.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Profiles associated with a ten-digit phone number.
    pub fn get_by_phone(&self, phone: &str) -> Result<Vec<Profile>, ApiError> {
        let request = self.build_get_by_phone(phone)?;
        self.parse_profile_list(self.send(&request)?)
    }

    /// The profile associated with an email address.
    pub fn get_by_email(&self, email: &str) -> Result<Profile, ApiError> {
        let request = self.build_get_by_email(email)?;
        self.parse_profile(self.send(&request)?)
    }

    pub fn get_by_profile_id(&self, id: &str) -> Result<Profile, ApiError> {
        let request = self.build_get_by_profile_id(id)?;
        self.parse_profile(self.send(&request)?)
    }

    /// Profiles matching a name plus an address line and zip code (or city
    /// and state).
    pub fn get_by_name_address(&self, search: &NameAddress) -> Result<Vec<Profile>, ApiError> {
        let request = self.build_get_by_name_address(search)?;
        self.parse_profile_list(self.send(&request)?)
    }

    pub fn get_fraud_level(&self, phone: &str) -> Result<FraudLevel, ApiError> {
        let request = self.build_get_fraud_level(phone)?;
        self.parse_fraud_level(self.send(&request)?)
    }

    /// Fraud level for the given call data.
    pub fn analyze_call(&self, call: &AnalyzeCallData) -> Result<FraudLevel, ApiError> {
        let request = self.build_analyze_call(call)?;
        self.parse_fraud_level(self.send(&request)?)
    }

    pub fn update_by_profile_id(&self, id: &str, update: &ProfileUpdate) -> Result<(), ApiError> {
        let request = self.build_update_by_profile_id(id, update)?;
        self.parse_empty(self.send(&request)?)
    }

    // -----------------------------------------------------------------------
    // Raw JSON operations
    // -----------------------------------------------------------------------

    pub fn get_by_phone_json(&self, phone: &str) -> Result<String, ApiError> {
        let request = self.build_get_by_phone(phone)?;
        self.parse_json(self.send(&request)?)
    }

    pub fn get_by_email_json(&self, email: &str) -> Result<String, ApiError> {
        let request = self.build_get_by_email(email)?;
        self.parse_json(self.send(&request)?)
    }

    pub fn get_by_profile_id_json(&self, id: &str) -> Result<String, ApiError> {
        let request = self.build_get_by_profile_id(id)?;
        self.parse_json(self.send(&request)?)
    }

    pub fn get_by_name_address_json(&self, search: &NameAddress) -> Result<String, ApiError> {
        let request = self.build_get_by_name_address(search)?;
        self.parse_json(self.send(&request)?)
    }

    pub fn get_fraud_level_json(&self, phone: &str) -> Result<String, ApiError> {
        let request = self.build_get_fraud_level(phone)?;
        self.parse_json(self.send(&request)?)
    }

    pub fn analyze_call_json(&self, call: &AnalyzeCallData) -> Result<String, ApiError> {
        let request = self.build_analyze_call(call)?;
        self.parse_json(self.send(&request)?)
    }

    /// Post an already serialized profile update.
    pub fn update_by_profile_id_json(&self, id: &str, data: &str) -> Result<(), ApiError> {
        let request = self.build_update_by_profile_id_json(id, data)?;
        self.parse_empty(self.send(&request)?)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_get_by_phone(&self, phone: &str) -> Result<HttpRequest, ApiError> {
        validate_phone(phone)?;
        let url = self.endpoint(RECORDS_PATH, &[("phone", phone), FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_get_by_email(&self, email: &str) -> Result<HttpRequest, ApiError> {
        ensure_not_empty(email, "email")?;
        let url = self.endpoint(RECORDS_PATH, &[("email", email), FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_get_by_profile_id(&self, id: &str) -> Result<HttpRequest, ApiError> {
        let id = path_segment(id, "id")?;
        let url = self.endpoint(&format!("{USERS_PATH}/{id}"), &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    /// Zip code takes precedence over city and state when both are given.
    pub fn build_get_by_name_address(&self, search: &NameAddress) -> Result<HttpRequest, ApiError> {
        validate_name_address(search)?;
        let mut params = vec![
            ("first_name", search.first_name.as_str()),
            ("last_name", search.last_name.as_str()),
            ("address", search.address.as_str()),
            FORMAT_PARAM,
        ];
        match search.zip_code.as_deref() {
            Some(zip) if !zip.is_empty() => params.push(("zip_code", zip)),
            _ => {
                params.push(("city", search.city.as_deref().unwrap_or_default()));
                params.push(("state", search.state.as_deref().unwrap_or_default()));
            }
        }
        let url = self.endpoint(RECORDS_PATH, &params)?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_get_fraud_level(&self, phone: &str) -> Result<HttpRequest, ApiError> {
        validate_phone(phone)?;
        let url = self.endpoint(FRAUD_PATH, &[("phone", phone), FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_analyze_call(&self, call: &AnalyzeCallData) -> Result<HttpRequest, ApiError> {
        ensure_not_empty(call.ani.as_deref().unwrap_or_default(), "ani")?;
        let url = self.endpoint(ANALYZE_CALL_PATH, &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Post, url).with_body(to_json(call)?))
    }

    pub fn build_update_by_profile_id(&self, id: &str, update: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        self.build_update_by_profile_id_json(id, &to_json(update)?)
    }

    pub fn build_update_by_profile_id_json(&self, id: &str, data: &str) -> Result<HttpRequest, ApiError> {
        let id = path_segment(id, "id")?;
        ensure_not_empty(data, "data")?;
        let url = self.endpoint(&format!("{USERS_PATH}/{id}"), &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Post, url).with_body(data.to_string()))
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_profile_list(&self, response: HttpResponse) -> Result<Vec<Profile>, ApiError> {
        let list: ProfileList = from_json(classify_response(&response)?)?;
        Ok(list.records)
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<Profile, ApiError> {
        from_json(classify_response(&response)?)
    }

    pub fn parse_fraud_level(&self, response: HttpResponse) -> Result<FraudLevel, ApiError> {
        from_json(classify_response(&response)?)
    }

    /// The success body as received.
    pub fn parse_json(&self, response: HttpResponse) -> Result<String, ApiError> {
        classify_response(&response).map(str::to_string)
    }

    /// For operations whose success body carries nothing of interest.
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        classify_response(&response)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    pub(crate) fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request)
    }

    /// `{api_url}{path}/?k=v&...` with keys and values lowercased and
    /// form-urlencoded in the order given.
    pub(crate) fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = format!("{}{}", self.api_url, path.trim_matches('/'));
        url.push('/');
        if !params.is_empty() {
            let lowered: Vec<(String, String)> = params
                .iter()
                .map(|(key, value)| (key.to_lowercase(), value.to_lowercase()))
                .collect();
            let query = serde_urlencoded::to_string(&lowered).map_err(|e| ApiError::Serialization(e.to_string()))?;
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }
}

/// Percent-encode `value` for use as a single path segment. Empty values and
/// the dot segments are rejected.
pub(crate) fn path_segment(value: &str, parameter: &str) -> Result<String, ApiError> {
    ensure_not_empty(value, parameter)?;
    if value == "." || value == ".." {
        return Err(ApiError::validation(parameter, format!("`{value}` is not a valid identifier.")));
    }
    Ok(urlencoding::encode(value).into_owned())
}

pub(crate) fn to_json<S: Serialize>(value: &S) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

pub(crate) fn from_json<D: DeserializeOwned>(body: &str) -> Result<D, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
