use thiserror::Error;

/// Errors raised by the VIES client and the validator.
///
/// The validator downgrades `ServiceUnavailable` and `ValidationFailed`
/// into unconfirmed [`ValidationResult`](crate::core::ValidationResult)s;
/// its callers only ever observe `InvalidArgument`.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ViesError {
    /// Caller-supplied input is structurally invalid. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The VIES service is transiently unreachable or overloaded.
    #[error("VIES service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The VIES service responded but signaled a logic-level problem,
    /// or an unexpected error occurred during the call.
    #[error("VAT validation failed: {0}")]
    ValidationFailed(String),
}
