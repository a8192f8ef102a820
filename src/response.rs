//! Response documents returned to the caller.

use serde::Serialize;

use crate::credentials::TemporaryCredentials;
use crate::error::ExchangeError;

/// Client-facing summary shared by every failure.
pub const ERROR_MESSAGE: &str = "Error processing request";

/// Status reported for every failure, whatever its kind.
pub const ERROR_STATUS_CODE: u16 = 400;

/// Either the credentials or the fixed-shape error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExchangeResponse {
    Credentials(TemporaryCredentials),
    Error(ErrorResponse),
}

impl ExchangeResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeResponse::Credentials(_))
    }

    /// Serializes the response as compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub body: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
    /// `<kind>: <cause>`, free of token, claim and credential material.
    pub details: String,
}

impl From<&ExchangeError> for ErrorResponse {
    fn from(err: &ExchangeError) -> Self {
        Self {
            status_code: ERROR_STATUS_CODE,
            body: ErrorBody {
                message: ERROR_MESSAGE.to_string(),
                details: format!("{}: {}", err.kind(), err.message()),
            },
        }
    }
}

impl From<crate::error::Result<TemporaryCredentials>> for ExchangeResponse {
    fn from(result: crate::error::Result<TemporaryCredentials>) -> Self {
        match result {
            Ok(credentials) => ExchangeResponse::Credentials(credentials),
            Err(err) => ExchangeResponse::Error(ErrorResponse::from(&err)),
        }
    }
}
