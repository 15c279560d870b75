//! Belgian VAT number validation — pure format and checksum checks.
//!
//! Belgian enterprise numbers are 10 digits ("BE0123456789"); VIES also
//! accepts the historic 9-digit form without the leading zero. The last
//! two digits are a modulo-97 check on the preceding seven. Both checks
//! run locally, before any network call.

/// Check the format of a cleaned Belgian VAT number.
///
/// Leading zeros are ignored; valid iff exactly 9 decimal digits remain.
pub fn is_valid_format(vat_number: &str) -> bool {
    let stripped = vat_number.trim_start_matches('0');
    stripped.len() == 9 && stripped.chars().all(|c| c.is_ascii_digit())
}

/// Check the modulo-97 check digits of a cleaned Belgian VAT number.
///
/// On the zero-stripped 9-digit string, the last two digits must equal
/// `97 - (first seven digits mod 97)`.
pub fn is_valid_checksum(vat_number: &str) -> bool {
    let stripped = vat_number.trim_start_matches('0');
    if stripped.len() != 9 || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let (Ok(base), Ok(check)) = (stripped[..7].parse::<u64>(), stripped[7..].parse::<u64>())
    else {
        return false;
    };
    97 - (base % 97) == check
}
