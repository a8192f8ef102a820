//! Bearer-role assumption.
//!
//! [`RoleAssumer`] is the async trait over an STS-style `AssumeRole` call that
//! accepts a provided context. [`StsRoleAssumer`] implements it with AWS STS.
//! [`assume_role`] fixes the session parameters and requires credential
//! material in the response.

mod client;

pub use client::StsRoleAssumer;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::AuthorizationContextAssertion;
use crate::credentials::TemporaryCredentials;
use crate::error::{ExchangeError, Result};

/// Session name used for every bearer-role session.
pub const ROLE_SESSION_NAME: &str = "IdentityBearerRoleSession";

/// Lifetime of the issued credentials, in seconds.
pub const SESSION_DURATION_SECS: i32 = 900;

/// Context provider that vouches for Identity Center identity-context assertions.
pub const IDENTITY_CENTER_CONTEXT_PROVIDER: &str =
    "arn:aws:iam::aws:contextProvider/IdentityCenter";

/// Parameters of a single role assumption.
#[derive(Clone, Copy)]
pub struct AssumeRoleRequest<'a> {
    pub role_arn: &'a str,
    pub session_name: &'static str,
    pub duration_seconds: i32,
    pub provider_arn: &'static str,
    pub context_assertion: &'a AuthorizationContextAssertion,
}

impl std::fmt::Debug for AssumeRoleRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssumeRoleRequest")
            .field("role_arn", &self.role_arn)
            .field("session_name", &self.session_name)
            .field("duration_seconds", &self.duration_seconds)
            .field("provider_arn", &self.provider_arn)
            .field("context_assertion", self.context_assertion)
            .finish()
    }
}

/// Assumes a role with a provided context assertion.
///
/// Returns `Ok(None)` when the call succeeded but carried no credentials;
/// remote or transport failures are [`ExchangeError::RoleAssumptionFailed`].
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume(&self, request: AssumeRoleRequest<'_>) -> Result<Option<TemporaryCredentials>>;
}

/// Assumes `role_arn` for a fixed-length session bound to `context`.
///
/// # Errors
///
/// Returns [`ExchangeError::RoleAssumptionFailed`] if the call is rejected or
/// returns no credentials.
#[tracing::instrument(name = "assume_bearer_role", skip(assumer, context))]
pub async fn assume_role(
    assumer: &dyn RoleAssumer,
    role_arn: &str,
    context: &AuthorizationContextAssertion,
) -> Result<TemporaryCredentials> {
    let request = AssumeRoleRequest {
        role_arn,
        session_name: ROLE_SESSION_NAME,
        duration_seconds: SESSION_DURATION_SECS,
        provider_arn: IDENTITY_CENTER_CONTEXT_PROVIDER,
        context_assertion: context,
    };

    match assumer.assume(request).await? {
        Some(credentials) => {
            info!(expiration = credentials.expiration(), "Bearer role assumed");
            Ok(credentials)
        }
        None => {
            warn!("AssumeRole response contained no credentials");
            Err(ExchangeError::RoleAssumptionFailed(
                "role assumption returned no credentials".to_string(),
            ))
        }
    }
}
