use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::{ValidationResult, ViesError};
use crate::vies::soap;
use crate::vies::transport::{BreakerConfig, CircuitBreaker, RetryConfig, backoff};

/// Production VIES endpoint (checkVatService SOAP port).
pub const VIES_SERVICE_URL: &str =
    "https://ec.europa.eu/taxation_customs/vies/services/checkVatService";

// Known-registered Belgian number used by the availability probe. The
// probe only cares whether VIES answers, not whether the number is valid.
const PROBE_COUNTRY: &str = "BE";
const PROBE_VAT_NUMBER: &str = "0477472701";

/// Abstraction over the VIES lookup so the validator can be exercised
/// without network access.
#[async_trait]
pub trait VatLookup: Send + Sync {
    /// Confirm a VAT number against VIES.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for malformed inputs, `ServiceUnavailable` for
    /// transport-level failures and unavailability faults,
    /// `ValidationFailed` for logic-level faults and unexpected errors.
    async fn check_vat(
        &self,
        country_code: &str,
        vat_number: &str,
    ) -> Result<ValidationResult, ViesError>;

    /// Health probe. Never fails; every error becomes `false`.
    async fn is_service_available(&self) -> bool;
}

/// Client configuration. Defaults match the live VIES contract.
#[derive(Debug, Clone)]
pub struct ViesClientConfig {
    /// SOAP endpoint URL.
    pub endpoint: String,
    /// Per-request deadline for `checkVat` calls.
    pub request_timeout: Duration,
    /// Tighter deadline for the availability probe.
    pub probe_timeout: Duration,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
}

impl Default for ViesClientConfig {
    fn default() -> Self {
        Self {
            endpoint: VIES_SERVICE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// SOAP client for the VIES `checkVat` service.
///
/// Holds a reusable connection pool; cheap to clone, and clones share
/// the pool and the circuit breaker.
#[derive(Debug, Clone)]
pub struct ViesClient {
    http: reqwest::Client,
    config: ViesClientConfig,
    breaker: CircuitBreaker,
}

impl ViesClient {
    /// Client against the production VIES endpoint.
    pub fn new() -> Result<Self, ViesError> {
        Self::with_config(ViesClientConfig::default())
    }

    pub fn with_config(config: ViesClientConfig) -> Result<Self, ViesError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ViesError::ValidationFailed(format!("failed to build HTTP client: {e}"))
            })?;
        let breaker = CircuitBreaker::new(config.breaker.clone());
        Ok(Self {
            http,
            config,
            breaker,
        })
    }

    async fn post_envelope(
        &self,
        envelope: &str,
        timeout: Duration,
    ) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .timeout(timeout)
            .body(envelope.to_string())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// POST with the retry schedule: network errors and non-success
    /// statuses retry with exponential backoff, and every attempt
    /// outcome feeds the circuit breaker.
    ///
    /// A final non-success response is still returned as `Ok` — fault
    /// classification must see the body before the status is judged.
    async fn send_with_retry(
        &self,
        envelope: &str,
    ) -> Result<(reqwest::StatusCode, String), ViesError> {
        let mut attempt = 0u32;
        loop {
            self.breaker.check()?;
            match self.post_envelope(envelope, self.config.request_timeout).await {
                Ok((status, body)) if status.is_success() => {
                    self.breaker.record_success();
                    return Ok((status, body));
                }
                Ok((status, body)) => {
                    self.breaker.record_failure();
                    if attempt >= self.config.retry.max_retries {
                        return Ok((status, body));
                    }
                    debug!(%status, attempt, "VIES returned non-success status");
                }
                Err(e) => {
                    self.breaker.record_failure();
                    if attempt >= self.config.retry.max_retries {
                        return Err(map_transport_error(e));
                    }
                    debug!(error = %e, attempt, "VIES request failed");
                }
            }
            attempt += 1;
            backoff(&self.config.retry, attempt).await;
        }
    }
}

#[async_trait]
impl VatLookup for ViesClient {
    async fn check_vat(
        &self,
        country_code: &str,
        vat_number: &str,
    ) -> Result<ValidationResult, ViesError> {
        validate_country_code(country_code)?;
        let vat_number = clean_for_vies(country_code, vat_number);
        if !is_valid_vat_alphabet(&vat_number) {
            return Err(ViesError::InvalidArgument(
                "VAT number must be 2-12 characters containing only alphanumeric characters, +, *, or ."
                    .into(),
            ));
        }

        let envelope = soap::build_check_vat_envelope(country_code, &vat_number)?;
        let (status, body) = self.send_with_retry(&envelope).await?;

        // Fault bodies can arrive on any HTTP status; classify before
        // the status check so the fault detail is not lost.
        if soap::contains_fault_markers(&body) {
            if let Some(fault) = soap::extract_fault_string(&body) {
                return Err(soap::classify_fault(&fault));
            }
        }

        if !status.is_success() {
            return Err(ViesError::ServiceUnavailable(format!(
                "VIES service returned HTTP {status}"
            )));
        }

        soap::parse_check_vat_response(&body, country_code, &vat_number)
    }

    async fn is_service_available(&self) -> bool {
        if self.breaker.check().is_err() {
            debug!("availability probe skipped, circuit breaker open");
            return false;
        }
        let envelope = match soap::build_check_vat_envelope(PROBE_COUNTRY, PROBE_VAT_NUMBER) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "failed to build probe envelope");
                return false;
            }
        };

        // Single attempt on the tight probe deadline; the retry backoff
        // schedule cannot fit inside five seconds.
        match self.post_envelope(&envelope, self.config.probe_timeout).await {
            Ok((status, body)) => {
                if !status.is_success() {
                    self.breaker.record_failure();
                    debug!(%status, "availability probe got non-success status");
                    return false;
                }
                if soap::contains_fault_markers(&body) && soap::is_unavailability_fault(&body) {
                    self.breaker.record_failure();
                    debug!("availability probe got an unavailability fault");
                    return false;
                }
                // VIES answered — even an INVALID_INPUT fault or an
                // invalid probe number means the service is up.
                self.breaker.record_success();
                true
            }
            Err(e) => {
                self.breaker.record_failure();
                debug!(error = %e, "availability probe failed");
                false
            }
        }
    }
}

fn validate_country_code(country_code: &str) -> Result<(), ViesError> {
    let well_formed =
        country_code.len() == 2 && country_code.chars().all(|c| c.is_ascii_uppercase());
    if well_formed {
        Ok(())
    } else {
        Err(ViesError::InvalidArgument(
            "Country code must be exactly 2 uppercase letters".into(),
        ))
    }
}

/// Wire-level cleaning: trim, uppercase, strip whitespace/dash/dot and
/// a leading country prefix. The validator cleans more aggressively;
/// this guards direct client callers.
fn clean_for_vies(country_code: &str, vat_number: &str) -> String {
    let cleaned: String = vat_number
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
        .collect();
    match cleaned.strip_prefix(country_code) {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}

/// The alphabet and length VIES accepts for a VAT number.
fn is_valid_vat_alphabet(vat_number: &str) -> bool {
    (2..=12).contains(&vat_number.len())
        && vat_number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '*' | '.'))
}

fn map_transport_error(e: reqwest::Error) -> ViesError {
    if e.is_builder() {
        ViesError::ValidationFailed(format!("Error validating VAT number: {e}"))
    } else {
        // Connection refused, DNS, timeout, broken transfer — all mean
        // the service is unreachable right now.
        ViesError::ServiceUnavailable(format!("Unable to connect to VIES service: {e}"))
    }
}
