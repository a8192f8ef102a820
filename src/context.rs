//! Extraction of the authorization-context assertion from a broker-issued token.

use serde_json::Value;
use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::token;

/// Claim carrying the identity context in tokens issued by IAM Identity Center.
pub const IDENTITY_CONTEXT_CLAIM: &str = "sts:identity_context";

/// Opaque assertion that binds an assumed-role session to an Identity Center user.
///
/// Only ever handed to the role-assumption call; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationContextAssertion(String);

impl AuthorizationContextAssertion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthorizationContextAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationContextAssertion(<redacted>)")
    }
}

/// Decodes `internal_token` and returns its identity-context claim.
///
/// # Errors
///
/// Returns [`ExchangeError::MissingIdentityContext`] if the token does not
/// decode, or if the claim is absent, empty, or not a string.
pub fn extract_context(internal_token: &str) -> Result<AuthorizationContextAssertion> {
    let decoded = token::decode(internal_token).map_err(|e| {
        ExchangeError::MissingIdentityContext(format!("broker token could not be decoded: {e}"))
    })?;

    match decoded.claim(IDENTITY_CONTEXT_CLAIM) {
        Some(Value::String(s)) if !s.is_empty() => {
            debug!(claim = IDENTITY_CONTEXT_CLAIM, "Identity context extracted");
            Ok(AuthorizationContextAssertion(s.clone()))
        }
        Some(Value::String(_)) => Err(ExchangeError::MissingIdentityContext(format!(
            "claim '{IDENTITY_CONTEXT_CLAIM}' is empty"
        ))),
        Some(_) => Err(ExchangeError::MissingIdentityContext(format!(
            "claim '{IDENTITY_CONTEXT_CLAIM}' is not a string"
        ))),
        None => Err(ExchangeError::MissingIdentityContext(format!(
            "claim '{IDENTITY_CONTEXT_CLAIM}' is absent"
        ))),
    }
}
