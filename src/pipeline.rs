//! The exchange pipeline.
//!
//! One request moves through a fixed sequence of stages:
//!
//! ```text
//! Received -> Validated -> Exchanged -> ContextExtracted -> Assumed -> Succeeded
//! ```
//!
//! Each arrow is a single component call. The first failing call ends the
//! request in `Failed(kind)`; later stages never run and nothing is retried.
//! The pipeline keeps no state between requests beyond its startup
//! configuration and clients, so one instance can serve concurrent requests.

use std::time::Instant;

use tracing::{Instrument, info, warn};

use crate::broker::{self, IdentityBroker, SsoOidcBroker};
use crate::config::ExchangeConfig;
use crate::context;
use crate::credentials::TemporaryCredentials;
use crate::error::{ErrorKind, ExchangeError, Result};
use crate::request::ExchangeRequest;
use crate::response::ExchangeResponse;
use crate::sts::{self, RoleAssumer, StsRoleAssumer};
use crate::token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Exchanged,
    ContextExtracted,
    Assumed,
    Succeeded,
    Failed(ErrorKind),
}

/// Result of one run: the last stage completed and the credentials or error.
#[derive(Debug)]
pub struct Outcome {
    /// Last stage reached before the run ended.
    pub reached: Stage,
    pub result: Result<TemporaryCredentials>,
}

impl Outcome {
    /// Terminal stage: `Succeeded` or `Failed(kind)`.
    pub fn stage(&self) -> Stage {
        match &self.result {
            Ok(_) => Stage::Succeeded,
            Err(e) => Stage::Failed(e.kind()),
        }
    }
}

pub struct ExchangePipeline {
    config: ExchangeConfig,
    broker: Box<dyn IdentityBroker>,
    assumer: Box<dyn RoleAssumer>,
}

impl ExchangePipeline {
    pub fn new(
        config: ExchangeConfig,
        broker: impl IdentityBroker + 'static,
        assumer: impl RoleAssumer + 'static,
    ) -> Self {
        Self {
            config,
            broker: Box::new(broker),
            assumer: Box::new(assumer),
        }
    }

    /// Builds a pipeline backed by IAM Identity Center OIDC and STS in the
    /// configured region.
    pub async fn from_config(config: ExchangeConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        let broker = SsoOidcBroker::new(&sdk_config);
        let assumer = StsRoleAssumer::new(&sdk_config);
        Self::new(config, broker, assumer)
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Runs every stage for `request` and reports where it ended.
    pub async fn run(&self, request: &ExchangeRequest) -> Outcome {
        let span = tracing::info_span!("exchange", role_arn = %self.config.bearer_role_arn);

        async {
            let started = Instant::now();
            let mut reached = Stage::Received;
            let result = self.advance(request, &mut reached).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(_) => info!(elapsed_ms, "Exchange succeeded"),
                Err(e) => warn!(
                    kind = %e.kind(),
                    cause = e.message(),
                    reached = ?reached,
                    elapsed_ms,
                    "Exchange failed"
                ),
            }

            Outcome { reached, result }
        }
        .instrument(span)
        .await
    }

    /// Runs the exchange and returns only the credentials or error.
    pub async fn exchange(&self, request: &ExchangeRequest) -> Result<TemporaryCredentials> {
        self.run(request).await.result
    }

    /// Runs the exchange and maps the outcome to the response document.
    pub async fn handle(&self, request: &ExchangeRequest) -> ExchangeResponse {
        ExchangeResponse::from(self.exchange(request).await)
    }

    /// Parses a raw JSON request, then runs [`handle`](Self::handle).
    ///
    /// A document that is not a valid request ends in `InvalidInput` without
    /// any network call.
    pub async fn handle_json(&self, raw: &str) -> ExchangeResponse {
        match ExchangeRequest::from_json(raw) {
            Ok(request) => self.handle(&request).await,
            Err(e) => {
                warn!(kind = %e.kind(), cause = e.message(), "Rejected request document");
                ExchangeResponse::from(Err(e))
            }
        }
    }

    async fn advance(
        &self,
        request: &ExchangeRequest,
        reached: &mut Stage,
    ) -> Result<TemporaryCredentials> {
        let id_token = request.id_token();

        if let Err(e) = token::decode(id_token) {
            return Err(ExchangeError::InvalidInput(format!(
                "idToken is not a structurally valid JWT: {e}"
            )));
        }
        *reached = Stage::Validated;

        let exchanged =
            broker::exchange(self.broker.as_ref(), &self.config.application_arn, id_token).await?;
        *reached = Stage::Exchanged;

        let assertion = context::extract_context(exchanged.internal_token())?;
        *reached = Stage::ContextExtracted;

        let credentials =
            sts::assume_role(self.assumer.as_ref(), &self.config.bearer_role_arn, &assertion)
                .await?;
        *reached = Stage::Assumed;

        Ok(credentials)
    }
}
