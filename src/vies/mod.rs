//! VIES SOAP protocol adapter.
//!
//! Owns envelope construction, fault detection and classification,
//! response parsing, and the outbound HTTP call with retry and a
//! circuit breaker. Targets exactly one WSDL operation (`checkVat`)
//! plus an availability probe — this is not a general SOAP layer.

mod client;
pub mod soap;
mod transport;

pub use client::{VIES_SERVICE_URL, VatLookup, ViesClient, ViesClientConfig};
pub use transport::{BreakerConfig, CircuitBreaker, RetryConfig};
