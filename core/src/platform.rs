//! Platform access: lookups on behalf of a platform account, and management
//! of the accounts themselves.
//!
//! Lookups reuse the `NextCallerClient` builders and attach the account in
//! the `X-Account-ID` header.

use crate::client::{from_json, path_segment, to_json, NextCallerClient, FORMAT_PARAM};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{classify_response, Transport, UreqTransport};
use crate::types::{
    AnalyzeCallData, FraudLevel, NameAddress, PlatformAccount, PlatformAccountUpdate, PlatformStatistics, Profile,
    ProfileUpdate,
};
use crate::validation::ensure_not_empty;

pub const ACCOUNT_ID_HEADER: &str = "X-Account-ID";

pub(crate) const ACCOUNTS_PATH: &str = "accounts";

#[derive(Debug, Clone)]
pub struct PlatformClient<T = UreqTransport> {
    inner: NextCallerClient<T>,
}

impl PlatformClient<UreqTransport> {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            inner: NextCallerClient::new(config)?,
        })
    }
}

impl<T: Transport> PlatformClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            inner: NextCallerClient::with_transport(config, transport),
        }
    }

    /// The underlying client, for requests made without an account.
    pub fn client(&self) -> &NextCallerClient<T> {
        &self.inner
    }

    // -----------------------------------------------------------------------
    // Lookups on behalf of an account
    // -----------------------------------------------------------------------

    pub fn get_by_phone(&self, phone: &str, account_id: &str) -> Result<Vec<Profile>, ApiError> {
        let request = scoped(self.inner.build_get_by_phone(phone)?, account_id)?;
        self.inner.parse_profile_list(self.inner.send(&request)?)
    }

    pub fn get_by_email(&self, email: &str, account_id: &str) -> Result<Profile, ApiError> {
        let request = scoped(self.inner.build_get_by_email(email)?, account_id)?;
        self.inner.parse_profile(self.inner.send(&request)?)
    }

    pub fn get_by_profile_id(&self, id: &str, account_id: &str) -> Result<Profile, ApiError> {
        let request = scoped(self.inner.build_get_by_profile_id(id)?, account_id)?;
        self.inner.parse_profile(self.inner.send(&request)?)
    }

    pub fn get_by_name_address(&self, search: &NameAddress, account_id: &str) -> Result<Vec<Profile>, ApiError> {
        let request = scoped(self.inner.build_get_by_name_address(search)?, account_id)?;
        self.inner.parse_profile_list(self.inner.send(&request)?)
    }

    pub fn get_fraud_level(&self, phone: &str, account_id: &str) -> Result<FraudLevel, ApiError> {
        let request = scoped(self.inner.build_get_fraud_level(phone)?, account_id)?;
        self.inner.parse_fraud_level(self.inner.send(&request)?)
    }

    pub fn analyze_call(&self, call: &AnalyzeCallData, account_id: &str) -> Result<FraudLevel, ApiError> {
        let request = scoped(self.inner.build_analyze_call(call)?, account_id)?;
        self.inner.parse_fraud_level(self.inner.send(&request)?)
    }

    pub fn update_by_profile_id(&self, id: &str, update: &ProfileUpdate, account_id: &str) -> Result<(), ApiError> {
        let request = scoped(self.inner.build_update_by_profile_id(id, update)?, account_id)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    // -----------------------------------------------------------------------
    // Raw JSON lookups on behalf of an account
    // -----------------------------------------------------------------------

    pub fn get_by_phone_json(&self, phone: &str, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_get_by_phone(phone)?, account_id)?)
    }

    pub fn get_by_email_json(&self, email: &str, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_get_by_email(email)?, account_id)?)
    }

    pub fn get_by_profile_id_json(&self, id: &str, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_get_by_profile_id(id)?, account_id)?)
    }

    pub fn get_by_name_address_json(&self, search: &NameAddress, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_get_by_name_address(search)?, account_id)?)
    }

    pub fn get_fraud_level_json(&self, phone: &str, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_get_fraud_level(phone)?, account_id)?)
    }

    pub fn analyze_call_json(&self, call: &AnalyzeCallData, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(scoped(self.inner.build_analyze_call(call)?, account_id)?)
    }

    pub fn update_by_profile_id_json(&self, id: &str, data: &str, account_id: &str) -> Result<(), ApiError> {
        let request = scoped(self.inner.build_update_by_profile_id_json(id, data)?, account_id)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    // -----------------------------------------------------------------------
    // Account management
    // -----------------------------------------------------------------------

    /// Summary of all calls made by all accounts. Pass `page` to walk a
    /// paginated listing.
    pub fn get_platform_statistics(&self, page: Option<u32>) -> Result<PlatformStatistics, ApiError> {
        let request = self.build_get_platform_statistics(page)?;
        self.parse_platform_statistics(self.inner.send(&request)?)
    }

    pub fn get_platform_statistics_json(&self, page: Option<u32>) -> Result<String, ApiError> {
        self.fetch_json(self.build_get_platform_statistics(page)?)
    }

    pub fn get_platform_account_json(&self, account_id: &str) -> Result<String, ApiError> {
        self.fetch_json(self.build_get_platform_account(account_id)?)
    }

    /// Create an account from an already serialized body.
    pub fn create_platform_account_json(&self, data: &str) -> Result<(), ApiError> {
        let request = self.build_create_platform_account_json(data)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    /// Update an account from an already serialized body.
    pub fn update_platform_account_json(&self, data: &str, account_id: &str) -> Result<(), ApiError> {
        let request = self.build_update_platform_account_json(data, account_id)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    pub fn get_platform_account(&self, account_id: &str) -> Result<PlatformAccount, ApiError> {
        let request = self.build_get_platform_account(account_id)?;
        self.parse_platform_account(self.inner.send(&request)?)
    }

    /// Create an account. `account.id` is required.
    pub fn create_platform_account(&self, account: &PlatformAccountUpdate) -> Result<(), ApiError> {
        let request = self.build_create_platform_account(account)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    pub fn update_platform_account(&self, account: &PlatformAccountUpdate, account_id: &str) -> Result<(), ApiError> {
        let request = self.build_update_platform_account(account, account_id)?;
        self.inner.parse_empty(self.inner.send(&request)?)
    }

    pub fn build_get_platform_statistics(&self, page: Option<u32>) -> Result<HttpRequest, ApiError> {
        let page = page.map(|page| page.to_string());
        let mut params = vec![FORMAT_PARAM];
        if let Some(page) = page.as_deref() {
            params.push(("page", page));
        }
        let url = self.inner.endpoint(ACCOUNTS_PATH, &params)?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_get_platform_account(&self, account_id: &str) -> Result<HttpRequest, ApiError> {
        let account_id = path_segment(account_id, "account_id")?;
        let url = self
            .inner
            .endpoint(&format!("{ACCOUNTS_PATH}/{account_id}"), &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn build_create_platform_account(&self, account: &PlatformAccountUpdate) -> Result<HttpRequest, ApiError> {
        ensure_not_empty(account.id.as_deref().unwrap_or_default(), "id")?;
        self.build_create_platform_account_json(&to_json(account)?)
    }

    pub fn build_create_platform_account_json(&self, data: &str) -> Result<HttpRequest, ApiError> {
        ensure_not_empty(data, "data")?;
        let url = self.inner.endpoint(ACCOUNTS_PATH, &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Post, url).with_body(data.to_string()))
    }

    pub fn build_update_platform_account(
        &self,
        account: &PlatformAccountUpdate,
        account_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.build_update_platform_account_json(&to_json(account)?, account_id)
    }

    pub fn build_update_platform_account_json(&self, data: &str, account_id: &str) -> Result<HttpRequest, ApiError> {
        let account_id = path_segment(account_id, "account_id")?;
        ensure_not_empty(data, "data")?;
        let url = self
            .inner
            .endpoint(&format!("{ACCOUNTS_PATH}/{account_id}"), &[FORMAT_PARAM])?;
        Ok(HttpRequest::new(HttpMethod::Put, url).with_body(data.to_string()))
    }

    pub fn parse_platform_statistics(&self, response: HttpResponse) -> Result<PlatformStatistics, ApiError> {
        from_json(classify_response(&response)?)
    }

    pub fn parse_platform_account(&self, response: HttpResponse) -> Result<PlatformAccount, ApiError> {
        from_json(classify_response(&response)?)
    }

    fn fetch_json(&self, request: HttpRequest) -> Result<String, ApiError> {
        self.inner.parse_json(self.inner.send(&request)?)
    }
}

fn scoped(request: HttpRequest, account_id: &str) -> Result<HttpRequest, ApiError> {
    ensure_not_empty(account_id, "account_id")?;
    Ok(request.with_header(ACCOUNT_ID_HEADER, account_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn client(mock: &MockTransport) -> PlatformClient<&MockTransport> {
        let config = ClientConfig::new("demo", "secret").with_base_url("http://localhost:3000");
        PlatformClient::with_transport(&config, mock)
    }

    fn account_header() -> Vec<(String, String)> {
        vec![(ACCOUNT_ID_HEADER.to_string(), "test_user1".to_string())]
    }

    #[test]
    fn lookups_carry_account_header() {
        let mock = MockTransport::default();
        mock.push(HttpResponse::new(200, r#"{"records": [{"id": "abc"}]}"#));
        mock.push(HttpResponse::new(200, r#"{"id": "abc"}"#));
        mock.push(HttpResponse::new(200, r#"{"spoofed": "false", "fraud_risk": "low"}"#));

        let platform = client(&mock);
        let profiles = platform.get_by_phone("2125558383", "test_user1").unwrap();
        assert_eq!(profiles[0].id.as_deref(), Some("abc"));
        platform.get_by_profile_id("abc", "test_user1").unwrap();
        platform.get_fraud_level("2125558383", "test_user1").unwrap();

        for request in mock.requests() {
            assert_eq!(request.headers, account_header());
        }
    }

    #[test]
    fn empty_account_id_never_reaches_transport() {
        let mock = MockTransport::default();
        let err = client(&mock).get_by_email("demo@nextcaller.com", "").unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "account_id"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn platform_lookups_still_validate_phone() {
        let mock = MockTransport::default();
        let err = client(&mock).get_fraud_level("123", "test_user1").unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "phone"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn analyze_call_on_behalf_of_account() {
        let mock = MockTransport::returning(200, r#"{"spoofed": "true", "fraud_risk": "high"}"#);
        let call = AnalyzeCallData {
            ani: Some("12125551212".to_string()),
            ..Default::default()
        };
        let level = client(&mock).analyze_call(&call, "test_user1").unwrap();
        assert_eq!(level.fraud_risk.as_deref(), Some("high"));
        assert_eq!(mock.requests()[0].headers, account_header());
    }

    #[test]
    fn statistics_without_page() {
        let mock = MockTransport::returning(
            200,
            r#"{"data": [{"id": "test_user1", "number_of_operations": 2}],
                "total_platform_operations": {"201411": 2}, "billed_platform_operations": {"201411": 1}}"#,
        );
        let stats = client(&mock).get_platform_statistics(None).unwrap();
        assert_eq!(stats.accounts.unwrap()[0].number_of_operations, Some(2));
        assert_eq!(mock.requests()[0].url, "http://localhost:3000/v2.1/accounts/?format=json");
    }

    #[test]
    fn statistics_with_page() {
        let mock = MockTransport::default();
        let request = client(&mock).build_get_platform_statistics(Some(2)).unwrap();
        assert_eq!(request.url, "http://localhost:3000/v2.1/accounts/?format=json&page=2");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn get_platform_account_by_id() {
        let mock = MockTransport::returning(
            200,
            r#"{"id": "test_user1", "first_name": "Platform", "company_name": "Acme",
                "billed_operations": {"201411": 4}, "resource_uri": "/v2.1/accounts/test_user1/"}"#,
        );
        let account = client(&mock).get_platform_account("test_user1").unwrap();
        assert_eq!(account.company_name.as_deref(), Some("Acme"));
        assert_eq!(account.billed_operations.unwrap()["201411"], 4);
        assert_eq!(
            mock.requests()[0].url,
            "http://localhost:3000/v2.1/accounts/test_user1/?format=json"
        );
    }

    #[test]
    fn create_platform_account_requires_id() {
        let mock = MockTransport::default();
        let err = client(&mock)
            .create_platform_account(&PlatformAccountUpdate::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "id"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn create_platform_account_posts_body() {
        let mock = MockTransport::returning(201, "");
        let account = PlatformAccountUpdate {
            id: Some("new_user".to_string()),
            email: Some("owner@acme.test".to_string()),
            ..Default::default()
        };
        client(&mock).create_platform_account(&account).unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "http://localhost:3000/v2.1/accounts/?format=json");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"id": "new_user", "email": "owner@acme.test"}));
    }

    #[test]
    fn update_platform_account_puts_to_account_path() {
        let mock = MockTransport::returning(204, "");
        let account = PlatformAccountUpdate {
            company_name: Some("Acme Two".to_string()),
            ..Default::default()
        };
        client(&mock).update_platform_account(&account, "test_user1").unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(
            request.url,
            "http://localhost:3000/v2.1/accounts/test_user1/?format=json"
        );
    }

    #[test]
    fn email_lookup_returns_single_profile() {
        let mock = MockTransport::returning(200, r#"{"id": "abc", "email": "demo@nextcaller.com"}"#);
        let profile = client(&mock).get_by_email("demo@nextcaller.com", "test_user1").unwrap();
        assert_eq!(profile.id.as_deref(), Some("abc"));
        assert_eq!(mock.requests()[0].headers, account_header());
    }

    #[test]
    fn account_ids_are_encoded_in_paths() {
        let mock = MockTransport::default();
        let platform = client(&mock);
        assert_eq!(
            platform.build_get_platform_account("team a").unwrap().url,
            "http://localhost:3000/v2.1/accounts/team%20a/?format=json"
        );
        assert_eq!(
            platform
                .build_update_platform_account(&PlatformAccountUpdate::default(), "x?page=2")
                .unwrap()
                .url,
            "http://localhost:3000/v2.1/accounts/x%3Fpage%3D2/?format=json"
        );
        let err = platform.get_platform_account("..").unwrap_err();
        assert!(matches!(err, ApiError::Validation { ref parameter, .. } if parameter == "account_id"));
    }

    #[test]
    fn json_variants_carry_account_header() {
        let mock = MockTransport::default();
        mock.push(HttpResponse::new(200, r#"{"records": []}"#));
        mock.push(HttpResponse::new(200, r#"{"spoofed": "false", "fraud_risk": "low"}"#));
        mock.push(HttpResponse::new(204, ""));

        let platform = client(&mock);
        assert_eq!(platform.get_by_phone_json("2125558383", "test_user1").unwrap(), r#"{"records": []}"#);
        assert_eq!(
            platform.get_fraud_level_json("2125558383", "test_user1").unwrap(),
            r#"{"spoofed": "false", "fraud_risk": "low"}"#
        );
        platform
            .update_by_profile_id_json("abc", r#"{"email":"a@b.test"}"#, "test_user1")
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        for request in &requests {
            assert_eq!(request.headers, account_header());
        }
        assert_eq!(requests[2].body.as_deref(), Some(r#"{"email":"a@b.test"}"#));
    }

    #[test]
    fn account_management_json_variants() {
        let stats = r#"{"data": [], "page": 2, "has_next": false}"#;
        let mock = MockTransport::default();
        mock.push(HttpResponse::new(200, stats));
        mock.push(HttpResponse::new(200, r#"{"id": "test_user1"}"#));
        mock.push(HttpResponse::new(201, ""));
        mock.push(HttpResponse::new(204, ""));

        let platform = client(&mock);
        assert_eq!(platform.get_platform_statistics_json(Some(2)).unwrap(), stats);
        assert_eq!(platform.get_platform_account_json("test_user1").unwrap(), r#"{"id": "test_user1"}"#);
        platform.create_platform_account_json(r#"{"id":"new_user"}"#).unwrap();
        platform
            .update_platform_account_json(r#"{"company_name":"Acme"}"#, "new_user")
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://localhost:3000/v2.1/accounts/?format=json&page=2");
        assert_eq!(requests[2].method, HttpMethod::Post);
        assert_eq!(requests[2].body.as_deref(), Some(r#"{"id":"new_user"}"#));
        assert_eq!(requests[3].method, HttpMethod::Put);
        assert_eq!(requests[3].url, "http://localhost:3000/v2.1/accounts/new_user/?format=json");
    }

    #[test]
    fn page_past_the_end_is_bad_response() {
        let mock = MockTransport::returning(
            400,
            r#"{"error": {"message": "Invalid page.", "code": "1116", "type": "Bad Request"}}"#,
        );
        match client(&mock).get_platform_statistics(Some(99)).unwrap_err() {
            ApiError::BadResponse { status, error, .. } => {
                assert_eq!(status, 400);
                assert_eq!(error.code.as_deref(), Some("1116"));
            }
            other => panic!("expected BadResponse, got {other:?}"),
        }
    }

    #[test]
    fn missing_account_is_bad_response() {
        let mock = MockTransport::returning(
            404,
            r#"{"error": {"message": "Account not found", "code": "404", "type": "Not Found"}}"#,
        );
        let err = client(&mock).get_platform_account("ghost").unwrap_err();
        assert!(matches!(err, ApiError::BadResponse { status: 404, .. }));
    }
}
