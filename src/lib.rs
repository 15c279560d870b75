//! # btwcheck
//!
//! Belgian and EU VAT number validation against the EU
//! [VIES](https://ec.europa.eu/taxation_customs/vies/) SOAP service.
//!
//! Two layers, composed top-down:
//!
//! - [`VatValidator`] — normalizes input, runs the Belgian modulo-97
//!   format and checksum checks locally (no network), delegates to VIES
//!   for confirmation, and downgrades transient service failures into
//!   unconfirmed results instead of errors.
//! - [`ViesClient`] — the SOAP protocol adapter: envelope construction,
//!   fault detection and classification, response parsing, plus retry
//!   with exponential backoff and a circuit breaker on the outbound call.
//!
//! ## Quick Start
//!
//! ```no_run
//! use btwcheck::{VatValidator, ViesClient};
//!
//! # async fn run() -> Result<(), btwcheck::ViesError> {
//! let validator = VatValidator::new(ViesClient::new()?);
//!
//! // Cleans the input and runs the local format and modulo-97 checks,
//! // then asks VIES for confirmation.
//! let result = validator.validate_belgian("BE 0477.472.701").await?;
//! assert!(result.is_valid);
//!
//! let status = validator.check_status().await;
//! println!("VIES available: {}", status.is_available);
//! # Ok(())
//! # }
//! ```
//!
//! The [`vies::VatLookup`] trait is the seam for testing: stub it to
//! exercise the validator without network access.

pub mod belgian;
pub mod core;
pub mod validator;
pub mod vies;

// Re-export the data model and main entry points at the crate root.
pub use crate::core::*;
pub use crate::validator::{VatValidator, clean_vat_number};
pub use crate::vies::{VatLookup, ViesClient, ViesClientConfig};
