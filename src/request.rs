//! The inbound exchange request.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ExchangeError, Result};

/// The single input of an exchange: the caller's external identity token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExchangeRequest {
    id_token: String,
}

/// Accepted request documents: the bare request, or a resolver event whose
/// `arguments` hold it.
#[derive(Deserialize)]
#[serde(untagged)]
enum Inbound {
    Direct(ExchangeRequest),
    Resolver { arguments: Map<String, Value> },
}

impl ExchangeRequest {
    pub fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
        }
    }

    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    /// Parses a JSON request document.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidInput`] for anything other than an
    /// object with a single non-empty `idToken` string, directly or under
    /// `arguments`. The message never quotes the input.
    pub fn from_json(raw: &str) -> Result<Self> {
        let invalid =
            || ExchangeError::InvalidInput("request is not a valid exchange request".to_string());

        // Only objects: derived struct deserializers would also accept arrays.
        let value: Value = serde_json::from_str(raw).map_err(|_| invalid())?;
        let Some(object) = value.as_object() else {
            return Err(invalid());
        };
        // A resolver envelope must not also carry a top-level token.
        if object.contains_key("arguments") && object.contains_key("idToken") {
            return Err(invalid());
        }
        let inbound: Inbound = serde_json::from_value(value).map_err(|_| invalid())?;

        let request: ExchangeRequest = match inbound {
            Inbound::Direct(request) => request,
            Inbound::Resolver { arguments } => {
                serde_json::from_value(Value::Object(arguments)).map_err(|_| invalid())?
            }
        };

        if request.id_token.trim().is_empty() {
            return Err(ExchangeError::InvalidInput("idToken is missing".to_string()));
        }

        Ok(request)
    }
}

impl std::fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRequest")
            .field("id_token", &"<redacted>")
            .finish()
    }
}
