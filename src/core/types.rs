use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A VAT validation request as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// 2-letter country code (e.g. "BE"). Case-insensitive on input.
    pub country_code: String,
    /// VAT number, with or without the country prefix and formatting
    /// punctuation ("BE 0477.472.701" is accepted).
    pub vat_number: String,
}

/// Outcome of a single VAT validation call.
///
/// Invariant: a valid result never carries an error message, and a
/// result with an error message is never valid. [`ValidationResult::rejected`]
/// upholds this for the rejection path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Whether the VAT number was confirmed valid.
    pub is_valid: bool,
    /// Uppercased 2-letter country code.
    pub country_code: String,
    /// Cleaned VAT number (uppercased, prefix and punctuation stripped).
    pub vat_number: String,
    /// Registered company name, if VIES reported one.
    pub name: Option<String>,
    /// Registered address, if VIES reported one.
    pub address: Option<String>,
    /// Date VIES processed the request.
    pub request_date: Option<NaiveDate>,
    /// Why the number could not be confirmed valid.
    pub error_message: Option<String>,
}

impl ValidationResult {
    /// An unconfirmed result with a descriptive message: local format or
    /// checksum failure, or a downgraded service failure.
    pub fn rejected(
        country_code: impl Into<String>,
        vat_number: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_valid: false,
            country_code: country_code.into(),
            vat_number: vat_number.into(),
            name: None,
            address: None,
            request_date: None,
            error_message: Some(message.into()),
        }
    }
}

/// Availability snapshot of the VIES service.
///
/// Invariant: when `is_available` is false the country map is empty —
/// per-country availability is only reported on a confirmed-up probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Whether the VIES endpoint answered the probe.
    pub is_available: bool,
    /// 2-letter member-state code to availability.
    pub country_availability: BTreeMap<String, bool>,
    /// When the probe ran.
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_result_upholds_invariant() {
        let r = ValidationResult::rejected("BE", "0123456789", "Invalid Belgian VAT number checksum");
        assert!(!r.is_valid);
        assert!(r.error_message.is_some());
        assert!(r.name.is_none());
        assert!(r.request_date.is_none());
    }

    #[test]
    fn request_uses_camel_case() {
        let req: ValidationRequest =
            serde_json::from_str(r#"{"countryCode":"BE","vatNumber":"0477472701"}"#).unwrap();
        assert_eq!(req.country_code, "BE");
        assert_eq!(req.vat_number, "0477472701");
    }

    #[test]
    fn result_serializes_camel_case() {
        let r = ValidationResult {
            is_valid: true,
            country_code: "BE".into(),
            vat_number: "0477472701".into(),
            name: Some("PROXIMUS".into()),
            address: None,
            request_date: NaiveDate::from_ymd_opt(2024, 6, 15),
            error_message: None,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"isValid\":true"));
        assert!(json.contains("\"countryCode\":\"BE\""));
        assert!(json.contains("\"requestDate\":\"2024-06-15\""));
    }

    #[test]
    fn status_serializes_camel_case() {
        let s = ServiceStatus {
            is_available: false,
            country_availability: BTreeMap::new(),
            checked_at: Utc::now(),
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"isAvailable\":false"));
        assert!(json.contains("\"countryAvailability\":{}"));
    }
}
