//! In-process imitation of the NextCaller v2.1 API.
//!
//! Serves a small seeded data set behind HTTP Basic authentication. A few
//! reserved phone numbers trigger the failure modes a real deployment
//! produces: rate limiting, an unparseable error body, and a missing record.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_VERSION: &str = "v2.1";
pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "secret";

pub const DEMO_PROFILE_ID: &str = "97d949a413f4ea8b85e9586e1f2d9a";
pub const DEMO_PHONE: &str = "2125558383";
pub const DEMO_EMAIL: &str = "demo@nextcaller.com";
pub const DEMO_ACCOUNT: &str = "test_user1";

/// Answers 429 with rate-limit headers.
pub const RATE_LIMITED_PHONE: &str = "9999999999";
/// Answers 500 with a plain-text body.
pub const BROKEN_PHONE: &str = "1111111111";

pub const RATE_LIMIT: u64 = 10;
pub const RATE_LIMIT_RESET: i64 = 1_700_000_000;

const ACCOUNT_ID_HEADER: &str = "x-account-id";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub email: String,
    pub phone: Vec<PhoneEntry>,
    pub address: Vec<AddressEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PhoneEntry {
    pub number: String,
    pub resource_uri: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AddressEntry {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub email: String,
    pub number_of_operations: u64,
    pub resource_uri: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct AccountUpdate {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct CallData {
    pub ani: Option<String>,
    pub dnis: Option<String>,
}

#[derive(Default)]
pub struct Store {
    pub profiles: BTreeMap<String, Profile>,
    pub accounts: BTreeMap<String, Account>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    authorization: Arc<str>,
}

pub fn app() -> Router {
    app_with_credentials(DEMO_USERNAME, DEMO_PASSWORD)
}

pub fn app_with_credentials(username: &str, password: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(seed())),
        authorization: format!("Basic {}", BASE64.encode(format!("{username}:{password}"))).into(),
    };

    let api = Router::new()
        .route("/records/", get(lookup_records))
        .route("/users/{id}/", get(get_profile).post(update_profile))
        .route("/fraud/", get(fraud_level))
        .route("/fraud/analyze/", post(analyze_call))
        .route("/accounts/", get(platform_statistics).post(create_account))
        .route("/accounts/{id}/", get(get_account).put(update_account));

    Router::new()
        .nest(&format!("/{API_VERSION}"), api)
        .layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn seed() -> Store {
    let mut store = Store::default();
    let jerry = Profile {
        id: DEMO_PROFILE_ID.to_string(),
        first_name: "Jerry".to_string(),
        last_name: "Seinfeld".to_string(),
        name: "Jerry Seinfeld".to_string(),
        email: DEMO_EMAIL.to_string(),
        phone: vec![PhoneEntry {
            number: DEMO_PHONE.to_string(),
            resource_uri: format!("/{API_VERSION}/records/{DEMO_PHONE}/"),
        }],
        address: vec![AddressEntry {
            line1: "129 West 81st Street".to_string(),
            city: "New York".to_string(),
            state: "NY".to_string(),
            zip_code: "10024".to_string(),
            country: "USA".to_string(),
        }],
        dob: Some("1954-04-29".to_string()),
        gender: Some("Male".to_string()),
    };
    store.profiles.insert(jerry.id.clone(), jerry);
    store.accounts.insert(
        DEMO_ACCOUNT.to_string(),
        Account {
            id: DEMO_ACCOUNT.to_string(),
            first_name: "Platform".to_string(),
            last_name: "User".to_string(),
            company_name: "Acme".to_string(),
            email: "platform@acme.test".to_string(),
            number_of_operations: 0,
            resource_uri: format!("/{API_VERSION}/accounts/{DEMO_ACCOUNT}/"),
        },
    );
    store
}

// ---------------------------------------------------------------------------
// Errors and middleware
// ---------------------------------------------------------------------------

fn api_error(status: StatusCode, message: &str) -> Response {
    error_with_description(status, message, Value::Null)
}

fn error_with_description(status: StatusCode, message: &str, description: Value) -> Response {
    let mut error = json!({
        "message": message,
        "code": status.as_u16().to_string(),
        "type": status.canonical_reason().unwrap_or("Error"),
    });
    if !description.is_null() {
        error["description"] = description;
    }
    (status, Json(json!({ "error": error }))).into_response()
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == &*state.authorization);
    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejecting unauthenticated request");
        return api_error(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided or are invalid.");
    }
    next.run(request).await
}

/// Count a platform operation when the request names an account.
async fn record_operation(db: &Db, headers: &HeaderMap) -> Result<(), Response> {
    let Some(account_id) = headers.get(ACCOUNT_ID_HEADER).and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };
    let mut store = db.write().await;
    match store.accounts.get_mut(account_id) {
        Some(account) => {
            account.number_of_operations += 1;
            Ok(())
        }
        None => {
            tracing::debug!(account_id, "unknown platform account");
            Err(api_error(StatusCode::NOT_FOUND, "Platform account not found."))
        }
    }
}

fn special_phone_response(phone: &str) -> Option<Response> {
    match phone {
        RATE_LIMITED_PHONE => {
            let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
            let headers = response.headers_mut();
            headers.insert("X-Rate-Limit-Limit", HeaderValue::from(RATE_LIMIT));
            headers.insert("X-Rate-Limit-Remaining", HeaderValue::from(0u64));
            headers.insert("X-Rate-Limit-Reset", HeaderValue::from(RATE_LIMIT_RESET));
            Some(response)
        }
        BROKEN_PHONE => Some((StatusCode::INTERNAL_SERVER_ERROR, "upstream lookup failed").into_response()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn matches_query(profile: &Profile, query: &BTreeMap<String, String>) -> bool {
    let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
    if let Some(phone) = query.get("phone") {
        return profile.phone.iter().any(|p| p.number == *phone);
    }
    if let Some(email) = query.get("email") {
        return eq(&profile.email, email);
    }
    let (Some(first), Some(last), Some(line)) =
        (query.get("first_name"), query.get("last_name"), query.get("address"))
    else {
        return false;
    };
    eq(&profile.first_name, first)
        && eq(&profile.last_name, last)
        && profile.address.iter().any(|a| {
            eq(&a.line1, line)
                && match query.get("zip_code") {
                    Some(zip) => a.zip_code == *zip,
                    None => {
                        query.get("city").is_some_and(|c| eq(&a.city, c))
                            && query.get("state").is_some_and(|s| eq(&a.state, s))
                    }
                }
        })
}

async fn lookup_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    if let Some(response) = query.get("phone").and_then(|phone| special_phone_response(phone)) {
        return response;
    }
    if let Err(response) = record_operation(&state.db, &headers).await {
        return response;
    }
    let store = state.db.read().await;
    let records: Vec<Profile> = store
        .profiles
        .values()
        .filter(|profile| matches_query(profile, &query))
        .cloned()
        .collect();
    // Email lookups answer with the profile itself, not a list envelope.
    match (records.first(), query.contains_key("email")) {
        (None, _) => api_error(StatusCode::NOT_FOUND, "No records found."),
        (Some(profile), true) => Json(profile).into_response(),
        (Some(_), false) => Json(json!({ "records": records })).into_response(),
    }
}

async fn get_profile(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(response) = record_operation(&state.db, &headers).await {
        return response;
    }
    let store = state.db.read().await;
    match store.profiles.get(&id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "Profile not found."),
    }
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Response {
    if let Some(email) = update.email.as_deref() {
        if !email.contains('@') {
            return error_with_description(
                StatusCode::BAD_REQUEST,
                "Validation error.",
                json!({ "email": ["Enter a valid email address."] }),
            );
        }
    }
    if let Err(response) = record_operation(&state.db, &headers).await {
        return response;
    }
    let mut store = state.db.write().await;
    let Some(profile) = store.profiles.get_mut(&id) else {
        return api_error(StatusCode::NOT_FOUND, "Profile not found.");
    };
    if let Some(first_name) = update.first_name {
        profile.first_name = first_name;
    }
    if let Some(last_name) = update.last_name {
        profile.last_name = last_name;
    }
    if let Some(email) = update.email {
        profile.email = email;
    }
    profile.name = format!("{} {}", profile.first_name, profile.last_name);
    StatusCode::NO_CONTENT.into_response()
}

// ---------------------------------------------------------------------------
// Fraud
// ---------------------------------------------------------------------------

async fn fraud_level(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    let Some(phone) = query.get("phone") else {
        return api_error(StatusCode::BAD_REQUEST, "Phone number is required.");
    };
    if let Some(response) = special_phone_response(phone) {
        return response;
    }
    if let Err(response) = record_operation(&state.db, &headers).await {
        return response;
    }
    let known = state
        .db
        .read()
        .await
        .profiles
        .values()
        .any(|profile| profile.phone.iter().any(|p| p.number == *phone));
    let risk = if known { "low" } else { "medium" };
    Json(json!({ "spoofed": "false", "fraud_risk": risk })).into_response()
}

async fn analyze_call(State(state): State<AppState>, headers: HeaderMap, Json(call): Json<CallData>) -> Response {
    let Some(ani) = call.ani.filter(|ani| !ani.is_empty()) else {
        return error_with_description(
            StatusCode::BAD_REQUEST,
            "Validation error.",
            json!({ "ani": ["This field is required."] }),
        );
    };
    if let Err(response) = record_operation(&state.db, &headers).await {
        return response;
    }
    // A caller presenting the dialed number as its own is treated as spoofed.
    let spoofed = call.dnis.as_deref() == Some(ani.as_str());
    let body = if spoofed {
        json!({ "spoofed": "true", "fraud_risk": "high" })
    } else {
        json!({ "spoofed": "false", "fraud_risk": "low" })
    };
    Json(body).into_response()
}

// ---------------------------------------------------------------------------
// Platform accounts
// ---------------------------------------------------------------------------

async fn platform_statistics(State(state): State<AppState>) -> Response {
    let store = state.db.read().await;
    let accounts: Vec<&Account> = store.accounts.values().collect();
    let total: u64 = accounts.iter().map(|a| a.number_of_operations).sum();
    Json(json!({
        "data": accounts,
        "total_platform_operations": { "201411": total },
        "billed_platform_operations": { "201411": total },
        "page": 1,
        "has_next": false,
        "total_pages": 1,
    }))
    .into_response()
}

async fn get_account(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.db.read().await;
    match store.accounts.get(&id) {
        Some(account) => Json(account).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "Platform account not found."),
    }
}

async fn create_account(State(state): State<AppState>, Json(input): Json<AccountUpdate>) -> Response {
    let Some(id) = input.id.filter(|id| !id.is_empty()) else {
        return error_with_description(
            StatusCode::BAD_REQUEST,
            "Validation error.",
            json!({ "id": ["This field is required."] }),
        );
    };
    let mut store = state.db.write().await;
    if store.accounts.contains_key(&id) {
        return error_with_description(
            StatusCode::BAD_REQUEST,
            "Validation error.",
            json!({ "id": ["Account with this id already exists."] }),
        );
    }
    let account = Account {
        resource_uri: format!("/{API_VERSION}/accounts/{id}/"),
        id: id.clone(),
        first_name: input.first_name.unwrap_or_default(),
        last_name: input.last_name.unwrap_or_default(),
        company_name: input.company_name.unwrap_or_default(),
        email: input.email.unwrap_or_default(),
        number_of_operations: 0,
    };
    store.accounts.insert(id, account);
    StatusCode::CREATED.into_response()
}

async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AccountUpdate>,
) -> Response {
    let mut store = state.db.write().await;
    let Some(account) = store.accounts.get_mut(&id) else {
        return api_error(StatusCode::NOT_FOUND, "Platform account not found.");
    };
    if let Some(first_name) = input.first_name {
        account.first_name = first_name;
    }
    if let Some(last_name) = input.last_name {
        account.last_name = last_name;
    }
    if let Some(company_name) = input.company_name {
        account.company_name = company_name;
    }
    if let Some(email) = input.email {
        account.email = email;
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn jerry() -> Profile {
        seed().profiles.remove(DEMO_PROFILE_ID).unwrap()
    }

    #[test]
    fn profile_serializes_with_api_field_names() {
        let json = serde_json::to_value(jerry()).unwrap();
        assert_eq!(json["phone"][0]["number"], DEMO_PHONE);
        assert_eq!(json["address"][0]["zip_code"], "10024");
        assert_eq!(json["dob"], "1954-04-29");
    }

    #[test]
    fn matches_by_phone_and_email() {
        let profile = jerry();
        assert!(matches_query(&profile, &query(&[("phone", DEMO_PHONE)])));
        assert!(matches_query(&profile, &query(&[("email", "DEMO@nextcaller.com")])));
        assert!(!matches_query(&profile, &query(&[("phone", "2125550000")])));
    }

    #[test]
    fn matches_by_lowercased_name_and_address() {
        let profile = jerry();
        let by_zip = query(&[
            ("first_name", "jerry"),
            ("last_name", "seinfeld"),
            ("address", "129 west 81st street"),
            ("zip_code", "10024"),
        ]);
        assert!(matches_query(&profile, &by_zip));

        let by_city = query(&[
            ("first_name", "jerry"),
            ("last_name", "seinfeld"),
            ("address", "129 west 81st street"),
            ("city", "new york"),
            ("state", "ny"),
        ]);
        assert!(matches_query(&profile, &by_city));
    }

    #[test]
    fn name_without_address_does_not_match() {
        assert!(!matches_query(&jerry(), &query(&[("first_name", "jerry"), ("last_name", "seinfeld")])));
    }

    #[test]
    fn seed_contains_demo_account() {
        let store = seed();
        assert_eq!(store.accounts[DEMO_ACCOUNT].number_of_operations, 0);
        assert_eq!(store.profiles.len(), 1);
    }
}
