//! Core data model and error taxonomy for VAT validation.

mod countries;
mod error;
mod types;

pub use countries::*;
pub use error::*;
pub use types::*;
