//! Entities exchanged with the NextCaller API.
//!
//! # Design
//! Fields mirror the API's JSON schema one-to-one. Everything the service may
//! omit is an `Option`, and absent values are skipped on serialization so a
//! parsed payload serializes back to the same document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

/// Month (`"YYYYMM"`) to operation count.
pub type OperationCounts = BTreeMap<String, u64>;

/// A consumer record returned by the profile endpoints.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "phone")]
    pub phones: Option<Vec<Phone>>,
    pub carrier: Option<String>,
    pub line_type: Option<String>,
    #[serde(rename = "address")]
    pub addresses: Option<Vec<Address>>,
    pub email: Option<String>,
    pub linked_emails: Option<Vec<String>>,
    pub relatives: Option<Vec<Relative>>,
    #[serde(rename = "dob")]
    pub date_of_birth: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub household_income: Option<String>,
    pub marital_status: Option<String>,
    pub presence_of_children: Option<String>,
    pub home_owner_status: Option<String>,
    pub market_value: Option<String>,
    pub length_of_residence: Option<String>,
    pub high_net_worth: Option<String>,
    pub occupation: Option<String>,
    pub education: Option<String>,
    pub department: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phone {
    pub number: Option<String>,
    pub resource_uri: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub zip_code: Option<String>,
    pub extended_zip: Option<String>,
    pub home_data: Option<Map<String, Value>>,
}

/// A profile linked to the requested one, usually a relative sharing a
/// landline.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relative {
    pub name: Option<String>,
    pub id: Option<String>,
}

/// Risk classification for a phone number or an analyzed call.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FraudLevel {
    pub spoofed: Option<String>,
    pub fraud_risk: Option<String>,
}

/// Envelope returned by the list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileList {
    pub records: Vec<Profile>,
}

/// Profile fields that can be posted back to the service.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub shipping_address1: Option<Address>,
    pub shipping_address2: Option<Address>,
}

/// Search input for the name/address lookup. Either `zip_code` or both
/// `city` and `state` must be provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Call data posted to the call analyzer.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeCallData {
    pub ani: Option<String>,
    pub dnis: Option<String>,
    pub headers: Option<Map<String, Value>>,
    pub meta: Option<BTreeMap<String, String>>,
}

/// Detailed information about a platform account.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformAccount {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub number_of_operations: Option<u64>,
    pub resource_uri: Option<String>,
    pub total_operations: Option<OperationCounts>,
    pub billed_operations: Option<OperationCounts>,
}

/// Platform account fields that can be created or updated.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformAccountUpdate {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
}

/// Summary of all API calls made by all platform accounts.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformStatistics {
    #[serde(rename = "data")]
    pub accounts: Option<Vec<PlatformAccount>>,
    pub total_platform_operations: Option<OperationCounts>,
    pub billed_platform_operations: Option<OperationCounts>,
    pub page: Option<u32>,
    pub has_next: Option<bool>,
    pub total_pages: Option<u32>,
    pub object_list: Option<Vec<PlatformAccount>>,
}

/// The `error` object of a failed response.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<BTreeMap<String, Vec<String>>>,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message: {}", self.message.as_deref().unwrap_or_default())?;
        write!(f, "\nCode: {}", self.code.as_deref().unwrap_or_default())?;
        write!(f, "\nType: {}", self.kind.as_deref().unwrap_or_default())?;
        for (field, messages) in self.description.iter().flatten() {
            write!(f, "\n{field} : {}", messages.join(" ;"))?;
        }
        Ok(())
    }
}

/// Wire shape of an error response: `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// The service reports error codes both as strings and as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
