//! EU member-state country codes as used by the VIES service.
//!
//! Note: VIES uses "EL" (not "GR") for Greece.

/// Check whether `code` is an EU member-state code known to VIES.
pub fn is_eu_country_code(code: &str) -> bool {
    EU_COUNTRY_CODES.binary_search(&code).is_ok()
}

/// The 27 EU member-state codes (sorted for binary search).
pub static EU_COUNTRY_CODES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "EL", "ES", "FI", "FR", "HR", "HU", "IE", "IT",
    "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];
