//! Error taxonomy for the exchange pipeline.
//!
//! Every stage reports one of the [`ErrorKind`]s below. Messages carried by an
//! [`ExchangeError`] are written to be safe for clients: they name the failing
//! step and a cause, never token, claim or credential material.

use std::fmt;

use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use serde::Serialize;
use thiserror::Error;

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    BrokerExchangeFailed,
    MissingIdentityContext,
    RoleAssumptionFailed,
    ConfigurationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::BrokerExchangeFailed => "BrokerExchangeFailed",
            ErrorKind::MissingIdentityContext => "MissingIdentityContext",
            ErrorKind::RoleAssumptionFailed => "RoleAssumptionFailed",
            ErrorKind::ConfigurationError => "ConfigurationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of an exchange, or of startup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Missing or structurally invalid request or token
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The identity broker rejected the grant, was unreachable, or returned no token
    #[error("broker exchange failed: {0}")]
    BrokerExchangeFailed(String),

    /// The broker-issued token could not be decoded or lacks the context claim
    #[error("missing identity context: {0}")]
    MissingIdentityContext(String),

    /// The bearer role could not be assumed or no credentials came back
    #[error("role assumption failed: {0}")]
    RoleAssumptionFailed(String),

    /// Required startup configuration is absent or malformed
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::InvalidInput(_) => ErrorKind::InvalidInput,
            ExchangeError::BrokerExchangeFailed(_) => ErrorKind::BrokerExchangeFailed,
            ExchangeError::MissingIdentityContext(_) => ErrorKind::MissingIdentityContext,
            ExchangeError::RoleAssumptionFailed(_) => ErrorKind::RoleAssumptionFailed,
            ExchangeError::Configuration(_) => ErrorKind::ConfigurationError,
        }
    }

    /// The cause without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ExchangeError::InvalidInput(m)
            | ExchangeError::BrokerExchangeFailed(m)
            | ExchangeError::MissingIdentityContext(m)
            | ExchangeError::RoleAssumptionFailed(m)
            | ExchangeError::Configuration(m) => m,
        }
    }
}

/// Reduces an AWS SDK failure to its error code and service message.
///
/// The full `Display` chain of an [`SdkError`] can embed request context, so
/// only the service-provided metadata (or the failure class for transport
/// errors) is kept.
pub(crate) fn describe_sdk_error<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::ServiceError(ctx) => {
            let service_err = ctx.err();
            format!(
                "{}: {}",
                service_err.code().unwrap_or("UnknownError"),
                service_err.message().unwrap_or("no message provided")
            )
        }
        SdkError::TimeoutError(_) => "request timed out".to_string(),
        SdkError::DispatchFailure(_) => "request could not be dispatched".to_string(),
        SdkError::ResponseError(_) => "response could not be parsed".to_string(),
        SdkError::ConstructionFailure(_) => "request could not be constructed".to_string(),
        _ => "unexpected SDK failure".to_string(),
    }
}
