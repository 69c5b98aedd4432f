//! Argument checks performed before a request is built.

use crate::error::ApiError;
use crate::types::NameAddress;

/// Number of digits in a valid phone number.
pub const PHONE_NUMBER_LENGTH: usize = 10;

const ZIP_CODE_LENGTH: usize = 5;

pub fn ensure_not_empty(value: &str, parameter: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::validation(parameter, format!("Parameter name: {parameter}.")));
    }
    Ok(())
}

/// A phone number must be exactly ten ASCII digits.
pub fn validate_phone(number: &str) -> Result<(), ApiError> {
    if number.is_empty() {
        return Err(ApiError::validation("phone", "Phone number cannot be empty or null."));
    }
    if number.chars().count() != PHONE_NUMBER_LENGTH {
        return Err(ApiError::validation(
            "phone",
            format!("Phone number should contain {PHONE_NUMBER_LENGTH} digits."),
        ));
    }
    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::validation("phone", "Phone number should contain only digits."));
    }
    Ok(())
}

/// Name/address searches need both names, an address line, and either a
/// five-digit zip code or a city and state. Every failed rule is reported.
pub fn validate_name_address(search: &NameAddress) -> Result<(), ApiError> {
    let mut problems = Vec::new();

    let has_zip = search
        .zip_code
        .as_deref()
        .is_some_and(|zip| zip.len() == ZIP_CODE_LENGTH && zip.bytes().all(|b| b.is_ascii_digit()));
    let has_city_state = !is_blank(search.city.as_deref()) && !is_blank(search.state.as_deref());
    if !has_zip && !has_city_state {
        problems.push("Invalid zip code or empty city and state");
    }
    if search.first_name.is_empty() || search.last_name.is_empty() {
        problems.push("Invalid first or last name");
    }
    if search.address.is_empty() {
        problems.push("Invalid address");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("name and address", problems.join(", ")))
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}
