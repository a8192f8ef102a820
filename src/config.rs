//! Startup configuration.
//!
//! All settings are read once, validated together, and then passed by
//! reference into the pipeline. Read from the environment (after `.env` is
//! loaded) with these keys:
//!
//! | Variable                   | Required | Meaning                                   |
//! |----------------------------|----------|-------------------------------------------|
//! | `REGION`                   | yes      | AWS region for the broker and STS clients |
//! | `IDP_APP_ARN`              | yes      | Identity Center application (client id)   |
//! | `IDENTITY_BEARER_ROLE_ARN` | yes      | Role assumed with the identity context    |
//! | `CALL_TIMEOUT_SECS`        | no       | Per-call timeout, default 10              |

use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use serde::Serialize;

use crate::error::{ExchangeError, Result};

pub const REGION_VAR: &str = "REGION";
pub const APPLICATION_ARN_VAR: &str = "IDP_APP_ARN";
pub const BEARER_ROLE_ARN_VAR: &str = "IDENTITY_BEARER_ROLE_ARN";
pub const CALL_TIMEOUT_VAR: &str = "CALL_TIMEOUT_SECS";

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeConfig {
    pub region: String,
    /// Client id presented to the identity broker.
    pub application_arn: String,
    pub bearer_role_arn: String,
    #[serde(serialize_with = "as_secs")]
    pub call_timeout: Duration,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl ExchangeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as missing. Every missing variable is reported in a
    /// single [`ExchangeError::Configuration`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let region = read(REGION_VAR);
        let application_arn = read(APPLICATION_ARN_VAR);
        let bearer_role_arn = read(BEARER_ROLE_ARN_VAR);

        let missing: Vec<&str> = [
            (REGION_VAR, region.is_none()),
            (APPLICATION_ARN_VAR, application_arn.is_none()),
            (BEARER_ROLE_ARN_VAR, bearer_role_arn.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        let (Some(region), Some(application_arn), Some(bearer_role_arn)) =
            (region, application_arn, bearer_role_arn)
        else {
            return Err(ExchangeError::Configuration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        };

        let call_timeout = match read(CALL_TIMEOUT_VAR) {
            None => DEFAULT_CALL_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ExchangeError::Configuration(format!(
                        "{CALL_TIMEOUT_VAR} must be a positive number of seconds, got '{raw}'"
                    )));
                }
            },
        };

        Ok(Self {
            region,
            application_arn,
            bearer_role_arn,
            call_timeout,
        })
    }

    /// Loads the shared AWS configuration for this region, with the per-call
    /// timeout applied to every operation.
    pub async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(self.call_timeout)
            .build();

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await
    }
}
