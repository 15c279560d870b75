//! VAT validation orchestration: input cleaning, the Belgian local
//! short-circuit, VIES delegation, and failure downgrading.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use crate::belgian;
use crate::core::{EU_COUNTRY_CODES, ServiceStatus, ValidationRequest, ValidationResult, ViesError};
use crate::vies::VatLookup;

/// Orchestrates VAT validation over a [`VatLookup`] implementation.
///
/// This is the single place where service failures are downgraded:
/// an unreachable or faulting VIES becomes an unconfirmed
/// `is_valid = false` result, never an error. Callers only ever observe
/// [`ViesError::InvalidArgument`], for blank inputs.
pub struct VatValidator<C> {
    client: C,
}

impl<C: VatLookup> VatValidator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Validate a VAT number for any EU member state.
    ///
    /// Belgian numbers get a local format and modulo-97 checksum check
    /// first; either failure short-circuits without a network call.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the country code or VAT number is blank.
    pub async fn validate(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, ViesError> {
        if request.country_code.trim().is_empty() {
            return Err(ViesError::InvalidArgument("Country code is required".into()));
        }
        if request.vat_number.trim().is_empty() {
            return Err(ViesError::InvalidArgument("VAT number is required".into()));
        }

        let country_code = request.country_code.to_uppercase();
        let vat_number = clean_vat_number(&country_code, &request.vat_number);

        if country_code == "BE" {
            if !belgian::is_valid_format(&vat_number) {
                return Ok(ValidationResult::rejected(
                    &country_code,
                    &vat_number,
                    "Invalid Belgian VAT number format. Expected format: BE0123456789 (10 digits)",
                ));
            }
            if !belgian::is_valid_checksum(&vat_number) {
                return Ok(ValidationResult::rejected(
                    &country_code,
                    &vat_number,
                    "Invalid Belgian VAT number checksum",
                ));
            }
        }

        match self.client.check_vat(&country_code, &vat_number).await {
            Ok(result) => Ok(result),
            Err(ViesError::ServiceUnavailable(detail)) => {
                debug!(%detail, "VIES unavailable, returning unconfirmed result");
                Ok(ValidationResult::rejected(
                    &country_code,
                    &vat_number,
                    "VIES service is currently unavailable. Please try again later.",
                ))
            }
            Err(e) => {
                let detail = match e {
                    ViesError::ValidationFailed(msg) | ViesError::InvalidArgument(msg) => msg,
                    other => other.to_string(),
                };
                Ok(ValidationResult::rejected(
                    &country_code,
                    &vat_number,
                    format!("Error validating VAT number: {detail}"),
                ))
            }
        }
    }

    /// Validate a Belgian VAT number (country code `BE` implied).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the VAT number is blank.
    pub async fn validate_belgian(
        &self,
        vat_number: &str,
    ) -> Result<ValidationResult, ViesError> {
        self.validate(&ValidationRequest {
            country_code: "BE".into(),
            vat_number: vat_number.into(),
        })
        .await
    }

    /// Snapshot VIES availability.
    ///
    /// Never fails: the probe reports a boolean and every failure mode
    /// maps to an unavailable status with an empty country map. On a
    /// confirmed-up probe all 27 member states are reported available —
    /// VIES has no per-country probe, so service-up is the best signal.
    pub async fn check_status(&self) -> ServiceStatus {
        let checked_at = Utc::now();
        let is_available = self.client.is_service_available().await;

        let mut country_availability = BTreeMap::new();
        if is_available {
            for code in EU_COUNTRY_CODES {
                country_availability.insert((*code).to_string(), true);
            }
        } else {
            debug!("VIES probe reported unavailable");
        }

        ServiceStatus {
            is_available,
            country_availability,
            checked_at,
        }
    }
}

/// Normalize a raw VAT number for `country_code`: trim, uppercase,
/// strip a leading country prefix, then drop everything outside the
/// accepted alphabet — digits only for BE, the VIES alphabet
/// (`[0-9A-Za-z+*.]`) otherwise.
pub fn clean_vat_number(country_code: &str, vat_number: &str) -> String {
    let upper = vat_number.trim().to_uppercase();
    let rest = upper.strip_prefix(country_code).unwrap_or(&upper);
    if country_code == "BE" {
        rest.chars().filter(char::is_ascii_digit).collect()
    } else {
        rest.chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '*' | '.'))
            .collect()
    }
}
