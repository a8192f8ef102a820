//! Identity broker exchange.
//!
//! [`IdentityBroker`] is the async trait for presenting a JWT-bearer grant to
//! a token broker. [`SsoOidcBroker`] implements it with the IAM Identity
//! Center OIDC `CreateTokenWithIAM` operation. [`exchange`] drives one grant
//! and turns a response without a token into a failure.

mod sso_oidc;

pub use sso_oidc::SsoOidcBroker;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ExchangeError, Result};

/// OAuth grant type for presenting an externally issued JWT (RFC 7523).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// A JWT-bearer grant as sent to the broker.
#[derive(Clone, Copy)]
pub struct JwtBearerGrant<'a> {
    /// Trusted application identifier the broker issues tokens for.
    pub client_id: &'a str,
    pub grant_type: &'static str,
    /// The external identity token.
    pub assertion: &'a str,
}

impl std::fmt::Debug for JwtBearerGrant<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtBearerGrant")
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant_type)
            .field("assertion", &"<redacted>")
            .finish()
    }
}

/// What the broker returned. `id_token` is `None` when the response carried no token.
pub struct BrokerResponse {
    pub id_token: Option<String>,
}

impl std::fmt::Debug for BrokerResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerResponse")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Token issued by the broker for the calling application.
pub struct BrokerExchangeResult {
    internal_token: String,
}

impl BrokerExchangeResult {
    pub fn internal_token(&self) -> &str {
        &self.internal_token
    }
}

impl std::fmt::Debug for BrokerExchangeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BrokerExchangeResult { internal_token: <redacted> }")
    }
}

/// Presents a JWT-bearer grant to an identity broker.
///
/// Implementations make exactly one remote call per invocation and report
/// remote or transport failures as [`ExchangeError::BrokerExchangeFailed`].
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    async fn create_token(&self, grant: JwtBearerGrant<'_>) -> Result<BrokerResponse>;
}

/// Exchanges the external token `assertion` for a broker-issued token.
///
/// # Errors
///
/// Returns [`ExchangeError::BrokerExchangeFailed`] if the broker call fails or
/// its response has no token.
#[tracing::instrument(name = "broker_exchange", skip(broker, assertion))]
pub async fn exchange(
    broker: &dyn IdentityBroker,
    app_id: &str,
    assertion: &str,
) -> Result<BrokerExchangeResult> {
    let grant = JwtBearerGrant {
        client_id: app_id,
        grant_type: JWT_BEARER_GRANT_TYPE,
        assertion,
    };

    let response = broker.create_token(grant).await?;

    match response.id_token {
        Some(internal_token) if !internal_token.is_empty() => {
            debug!("Broker issued internal token");
            Ok(BrokerExchangeResult { internal_token })
        }
        _ => {
            warn!("Broker response contained no idToken");
            Err(ExchangeError::BrokerExchangeFailed(
                "broker response did not include an idToken".to_string(),
            ))
        }
    }
}
