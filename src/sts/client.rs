use async_trait::async_trait;
use aws_sdk_sts::primitives::DateTimeFormat;
use aws_sdk_sts::types::{Credentials, ProvidedContext};
use tracing::warn;

use super::{AssumeRoleRequest, RoleAssumer};
use crate::credentials::TemporaryCredentials;
use crate::error::{ExchangeError, Result, describe_sdk_error};

/// Assumes the bearer role through AWS STS.
///
/// The caller needs `sts:AssumeRole` and `sts:SetContext` on the role, and
/// the role's trust policy must allow both actions for the caller.
pub struct StsRoleAssumer {
    client: aws_sdk_sts::Client,
}

impl StsRoleAssumer {
    /// Creates an STS client from an already loaded AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(config),
        }
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume(&self, request: AssumeRoleRequest<'_>) -> Result<Option<TemporaryCredentials>> {
        let provided_context = ProvidedContext::builder()
            .provider_arn(request.provider_arn)
            .context_assertion(request.context_assertion.as_str())
            .build();

        let output = self
            .client
            .assume_role()
            .role_arn(request.role_arn)
            .role_session_name(request.session_name)
            .duration_seconds(request.duration_seconds)
            .provided_contexts(provided_context)
            .send()
            .await
            .map_err(|e| {
                let detail = describe_sdk_error(&e);
                warn!(error = %detail, "AssumeRole failed");
                ExchangeError::RoleAssumptionFailed(detail)
            })?;

        output.credentials.as_ref().map(to_temporary).transpose()
    }
}

fn to_temporary(credentials: &Credentials) -> Result<TemporaryCredentials> {
    let expiration = credentials
        .expiration()
        .fmt(DateTimeFormat::DateTime)
        .map_err(|e| {
            ExchangeError::RoleAssumptionFailed(format!("credential expiration is unrepresentable: {e}"))
        })?;

    Ok(TemporaryCredentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        credentials.session_token(),
        expiration,
    ))
}
