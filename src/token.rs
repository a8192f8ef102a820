//! Structural decoding of compact JWTs.
//!
//! Nothing here verifies a signature or an expiry. The external token is
//! verified by the identity broker, and the broker-issued token is trusted by
//! virtue of its issuer, so this module only checks that a token has the shape
//! `header.payload.signature` with JSON-object header and payload.

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Payload,
    Signature,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Header => f.write_str("header"),
            Segment::Payload => f.write_str("payload"),
            Segment::Signature => f.write_str("signature"),
        }
    }
}

/// Why a string is not a structurally valid token.
///
/// Variants describe the defect only; they never echo token content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("{0} segment is not valid base64url")]
    Encoding(Segment),

    #[error("{0} segment is not a JSON object")]
    NotAnObject(Segment),
}

/// Header and payload of a decoded token.
#[derive(Clone, PartialEq)]
pub struct DecodedToken {
    header: Map<String, Value>,
    payload: Map<String, Value>,
}

impl DecodedToken {
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Looks up a payload claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.header.keys().map(String::as_str)
    }

    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.payload.keys().map(String::as_str)
    }
}

// Claim values can be identifying; keep them out of debug output.
impl std::fmt::Debug for DecodedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedToken")
            .field("header", &self.header.keys().collect::<Vec<_>>())
            .field("payload", &self.payload.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// base64url that accepts canonical padding or none, but never extra `=`.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes a compact JWT into its header and payload objects.
///
/// The signature segment must be present and use only the base64url
/// alphabet, but may be empty. Its value is otherwise ignored.
///
/// # Errors
///
/// Returns a [`TokenError`] naming the first structural defect found.
pub fn decode(token: &str) -> Result<DecodedToken, TokenError> {
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let header = decode_segment(segments[0], Segment::Header)?;
    let payload = decode_segment(segments[1], Segment::Payload)?;

    let signature_ok = segments[2]
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !signature_ok {
        return Err(TokenError::Encoding(Segment::Signature));
    }

    Ok(DecodedToken { header, payload })
}

/// Returns `true` if `token` decodes into a header object and a payload object.
pub fn validate(token: &str) -> bool {
    decode(token).is_ok()
}

fn decode_segment(raw: &str, segment: Segment) -> Result<Map<String, Value>, TokenError> {
    if raw.is_empty() {
        return Err(TokenError::Encoding(segment));
    }

    // Padded base64url is tolerated; some issuers still emit it.
    let bytes = SEGMENT_ENGINE
        .decode(raw)
        .map_err(|_| TokenError::Encoding(segment))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(TokenError::NotAnObject(segment)),
    }
}
