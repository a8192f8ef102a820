use async_trait::async_trait;
use tracing::warn;

use super::{BrokerResponse, IdentityBroker, JwtBearerGrant};
use crate::error::{ExchangeError, Result, describe_sdk_error};

/// Exchanges tokens through the IAM Identity Center OIDC service.
///
/// The calling process needs `sso-oauth:CreateTokenWithIAM`, and the
/// application named by the grant's client id must trust the external issuer.
pub struct SsoOidcBroker {
    client: aws_sdk_ssooidc::Client,
}

impl SsoOidcBroker {
    /// Creates a broker client from an already loaded AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssooidc::Client::new(config),
        }
    }
}

#[async_trait]
impl IdentityBroker for SsoOidcBroker {
    async fn create_token(&self, grant: JwtBearerGrant<'_>) -> Result<BrokerResponse> {
        let output = self
            .client
            .create_token_with_iam()
            .client_id(grant.client_id)
            .grant_type(grant.grant_type)
            .assertion(grant.assertion)
            .send()
            .await
            .map_err(|e| {
                let detail = describe_sdk_error(&e);
                warn!(error = %detail, "CreateTokenWithIAM failed");
                ExchangeError::BrokerExchangeFailed(detail)
            })?;

        Ok(BrokerResponse {
            id_token: output.id_token,
        })
    }
}
