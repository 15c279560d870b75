//! SOAP 1.1 envelope construction and response parsing for the VIES
//! `checkVat` operation.
//!
//! Parsing matches elements by local name, since VIES responses arrive
//! with varying namespace prefixes (`ns2:valid`, `env:Body`, ...).

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::core::{ValidationResult, ViesError};

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// VIES checkVat types namespace, per the service WSDL.
pub const VIES_TYPES_NS: &str = "urn:ec.europa.eu:taxud:vies:services:checkVat:types";

fn xml_io(e: std::io::Error) -> ViesError {
    ViesError::ValidationFailed(format!("SOAP envelope write error: {e}"))
}

/// Build the SOAP 1.1 request envelope for a `checkVat` call.
///
/// Inputs must already be validated and cleaned; quick-xml escapes the
/// element text, so a hostile VAT number cannot break out of the body.
pub fn build_check_vat_envelope(
    country_code: &str,
    vat_number: &str,
) -> Result<String, ViesError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_io)?;

    let mut envelope = BytesStart::new("soap:Envelope");
    envelope.push_attribute(("xmlns:soap", SOAP_ENVELOPE_NS));
    envelope.push_attribute(("xmlns:urn", VIES_TYPES_NS));
    writer.write_event(Event::Start(envelope)).map_err(xml_io)?;
    writer
        .write_event(Event::Start(BytesStart::new("soap:Body")))
        .map_err(xml_io)?;
    writer
        .write_event(Event::Start(BytesStart::new("urn:checkVat")))
        .map_err(xml_io)?;

    for (name, text) in [("urn:countryCode", country_code), ("urn:vatNumber", vat_number)] {
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("urn:checkVat")))
        .map_err(xml_io)?;
    writer
        .write_event(Event::End(BytesEnd::new("soap:Body")))
        .map_err(xml_io)?;
    writer
        .write_event(Event::End(BytesEnd::new("soap:Envelope")))
        .map_err(xml_io)?;

    let buf = writer.into_inner().into_inner();
    String::from_utf8(buf)
        .map_err(|e| ViesError::ValidationFailed(format!("SOAP envelope UTF-8 error: {e}")))
}

/// Parse a `checkVatResponse` body into a [`ValidationResult`].
///
/// `valid` defaults to false when absent or unparseable; `requestDate`
/// is dropped when unparseable. Country code and VAT number come from
/// the caller-supplied cleaned values, not from the response.
pub fn parse_check_vat_response(
    xml: &str,
    country_code: &str,
    vat_number: &str,
) -> Result<ValidationResult, ViesError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<String> = None;
    let mut is_valid = false;
    let mut name: Option<String> = None;
    let mut address: Option<String> = None;
    let mut request_date: Option<NaiveDate> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                current = Some(local_name(e.name().as_ref()).to_string());
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current.as_deref() {
                    Some("valid") => is_valid = text.trim() == "true",
                    Some("name") => name = filter_placeholder(&text),
                    Some("address") => address = filter_placeholder(&text),
                    Some("requestDate") => request_date = parse_request_date(&text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ViesError::ValidationFailed(format!(
                    "malformed VIES response XML: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(ValidationResult {
        is_valid,
        country_code: country_code.to_string(),
        vat_number: vat_number.to_string(),
        name,
        address,
        request_date,
        error_message: None,
    })
}

/// Cheap containment probe; full fault extraction only runs when this hits.
pub fn contains_fault_markers(body: &str) -> bool {
    body.contains("soap:Fault") || body.contains("faultstring")
}

/// Pull the `faultstring` text out of a SOAP fault body, prefix-tolerant.
pub fn extract_fault_string(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_fault_string = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                in_fault_string = local_name(e.name().as_ref()) == "faultstring";
            }
            Ok(Event::Text(ref e)) if in_fault_string => {
                return Some(e.unescape().unwrap_or_default().trim().to_string());
            }
            Ok(Event::End(_)) => in_fault_string = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

enum FaultKind {
    Unavailable,
    Failed,
}

/// Known VIES fault codes with their classification and user-facing
/// message. Checked top-to-bottom, first substring match wins — the
/// order is a deliberate tie-break, so this stays a sequential scan,
/// never a map.
const FAULT_TABLE: &[(&str, FaultKind, &str)] = &[
    (
        "INVALID_INPUT",
        FaultKind::Failed,
        "Invalid input: The provided CountryCode is invalid or the VAT number is empty",
    ),
    (
        "GLOBAL_MAX_CONCURRENT_REQ",
        FaultKind::Unavailable,
        "Your request cannot be processed due to high traffic on the web application. Please try again later.",
    ),
    (
        "MS_MAX_CONCURRENT_REQ",
        FaultKind::Unavailable,
        "Your request cannot be processed due to high traffic towards the Member State you are trying to reach. Please try again later.",
    ),
    (
        "SERVICE_UNAVAILABLE",
        FaultKind::Unavailable,
        "VIES service is temporarily unavailable. An error was encountered either at the network level or the Web application level. Please try again later.",
    ),
    (
        "MS_UNAVAILABLE",
        FaultKind::Unavailable,
        "The application at the Member State is not replying or not available. Please try again later.",
    ),
    (
        "TIMEOUT",
        FaultKind::Unavailable,
        "The application did not receive a reply within the allocated time period. Please try again later.",
    ),
];

/// Classify a VIES `faultstring` into the error taxonomy.
pub fn classify_fault(fault_string: &str) -> ViesError {
    for (code, kind, message) in FAULT_TABLE {
        if fault_string.contains(code) {
            return match kind {
                FaultKind::Unavailable => ViesError::ServiceUnavailable((*message).to_string()),
                FaultKind::Failed => ViesError::ValidationFailed((*message).to_string()),
            };
        }
    }
    ViesError::ValidationFailed(format!("VIES service returned an error: {fault_string}"))
}

/// Fault codes that make the availability probe report the service as
/// down. Other faults (e.g. INVALID_INPUT) still mean VIES answered.
pub fn is_unavailability_fault(body: &str) -> bool {
    ["SERVICE_UNAVAILABLE", "MS_UNAVAILABLE", "TIMEOUT"]
        .iter()
        .any(|code| body.contains(code))
}

fn local_name(name: &[u8]) -> &str {
    let name = std::str::from_utf8(name).unwrap_or("");
    name.split(':').next_back().unwrap_or(name)
}

/// VIES reports missing name/address as "---"; treat that and empty
/// strings as absent.
fn filter_placeholder(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "---" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// VIES dates come as "2024-06-15+02:00"; take the date part, drop the
/// offset, and give up silently on anything else.
fn parse_request_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <ns2:checkVatResponse xmlns:ns2="urn:ec.europa.eu:taxud:vies:services:checkVat:types">
      <ns2:countryCode>BE</ns2:countryCode>
      <ns2:vatNumber>0477472701</ns2:vatNumber>
      <ns2:requestDate>2024-06-15+02:00</ns2:requestDate>
      <ns2:valid>true</ns2:valid>
      <ns2:name>PROXIMUS</ns2:name>
      <ns2:address>BOULEVARD DU ROI ALBERT II 27
1030 BRUXELLES</ns2:address>
    </ns2:checkVatResponse>
  </env:Body>
</env:Envelope>"#;

    const FAULT: &str = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>SERVICE_UNAVAILABLE</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    #[test]
    fn envelope_structure() {
        let xml = build_check_vat_envelope("BE", "0477472701").unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\""));
        assert!(xml.contains("xmlns:urn=\"urn:ec.europa.eu:taxud:vies:services:checkVat:types\""));
        assert!(xml.contains("<urn:checkVat>"));
        assert!(xml.contains("<urn:countryCode>BE</urn:countryCode>"));
        assert!(xml.contains("<urn:vatNumber>0477472701</urn:vatNumber>"));
    }

    #[test]
    fn envelope_escapes_text() {
        let xml = build_check_vat_envelope("BE", "12<34").unwrap();
        assert!(xml.contains("12&lt;34"));
        assert!(!xml.contains("<urn:vatNumber>12<34"));
    }

    #[test]
    fn parse_full_response() {
        let r = parse_check_vat_response(RESPONSE, "BE", "0477472701").unwrap();
        assert!(r.is_valid);
        assert_eq!(r.country_code, "BE");
        assert_eq!(r.vat_number, "0477472701");
        assert_eq!(r.name.as_deref(), Some("PROXIMUS"));
        assert!(r.address.as_deref().unwrap().contains("BRUXELLES"));
        assert_eq!(r.request_date, NaiveDate::from_ymd_opt(2024, 6, 15));
        assert!(r.error_message.is_none());
    }

    #[test]
    fn parse_invalid_number_response() {
        let xml = RESPONSE
            .replace("<ns2:valid>true</ns2:valid>", "<ns2:valid>false</ns2:valid>")
            .replace("PROXIMUS", "---");
        let r = parse_check_vat_response(&xml, "BE", "0477472701").unwrap();
        assert!(!r.is_valid);
        assert!(r.name.is_none(), "--- placeholder must be filtered");
    }

    #[test]
    fn parse_missing_valid_defaults_false() {
        let xml = RESPONSE.replace("<ns2:valid>true</ns2:valid>", "");
        let r = parse_check_vat_response(&xml, "BE", "0477472701").unwrap();
        assert!(!r.is_valid);
    }

    #[test]
    fn parse_bad_date_dropped() {
        let xml = RESPONSE.replace("2024-06-15+02:00", "not-a-date");
        let r = parse_check_vat_response(&xml, "BE", "0477472701").unwrap();
        assert!(r.request_date.is_none());
    }

    #[test]
    fn parse_plain_date_without_offset() {
        let xml = RESPONSE.replace("2024-06-15+02:00", "2024-06-15");
        let r = parse_check_vat_response(&xml, "BE", "0477472701").unwrap();
        assert_eq!(r.request_date, NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn parse_malformed_xml_fails() {
        assert!(parse_check_vat_response("<env:Envelope><unclosed", "BE", "1").is_err());
    }

    #[test]
    fn fault_markers() {
        assert!(contains_fault_markers(FAULT));
        assert!(!contains_fault_markers(RESPONSE));
    }

    #[test]
    fn fault_string_extraction() {
        assert_eq!(extract_fault_string(FAULT).as_deref(), Some("SERVICE_UNAVAILABLE"));
        assert!(extract_fault_string(RESPONSE).is_none());
        assert!(extract_fault_string("not xml at all").is_none());
    }

    #[test]
    fn fault_classification_table() {
        let cases: &[(&str, bool, &str)] = &[
            ("INVALID_INPUT", false, "Invalid input"),
            ("GLOBAL_MAX_CONCURRENT_REQ", true, "high traffic on the web application"),
            ("MS_MAX_CONCURRENT_REQ", true, "high traffic towards the Member State"),
            ("SERVICE_UNAVAILABLE", true, "temporarily unavailable"),
            ("MS_UNAVAILABLE", true, "not replying or not available"),
            ("TIMEOUT", true, "allocated time period"),
        ];
        for &(code, unavailable, fragment) in cases {
            match classify_fault(code) {
                ViesError::ServiceUnavailable(msg) => {
                    assert!(unavailable, "{code} should not be ServiceUnavailable");
                    assert!(msg.contains(fragment), "{code}: {msg}");
                }
                ViesError::ValidationFailed(msg) => {
                    assert!(!unavailable, "{code} should not be ValidationFailed");
                    assert!(msg.contains(fragment), "{code}: {msg}");
                }
                other => panic!("unexpected classification for {code}: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_fault_preserves_detail() {
        match classify_fault("SOMETHING_ELSE") {
            ViesError::ValidationFailed(msg) => {
                assert!(msg.contains("VIES service returned an error"));
                assert!(msg.contains("SOMETHING_ELSE"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn classification_order_first_match_wins() {
        // A faultstring carrying two table codes classifies as the
        // earlier table entry, regardless of position in the string.
        match classify_fault("MS_UNAVAILABLE after GLOBAL_MAX_CONCURRENT_REQ") {
            ViesError::ServiceUnavailable(msg) => {
                assert!(msg.contains("high traffic on the web application"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unavailability_faults_for_probe() {
        assert!(is_unavailability_fault("...SERVICE_UNAVAILABLE..."));
        assert!(is_unavailability_fault("...MS_UNAVAILABLE..."));
        assert!(is_unavailability_fault("...TIMEOUT..."));
        assert!(!is_unavailability_fault("...INVALID_INPUT..."));
    }
}
