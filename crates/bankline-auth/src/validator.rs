//! Client-side credential checks.
//!
//! These are shape and expiry checks only. Signatures are never verified
//! here; the backend remains the authority on whether a token is genuine.

use std::collections::HashMap;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// base64url with optional padding.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

// Timestamps may arrive as integers or floats.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(numeric_claim))
}

fn numeric_claim(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Claims carried in a credential's payload segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub exp: Option<i64>,
    /// Issued at, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub iat: Option<i64>,
    pub sub: Option<String>,
    pub email: Option<String>,

    #[serde(flatten)]
    pub additional_claims: HashMap<String, Value>,
}

impl Claims {
    /// Expiry as a timestamp, if the claim is present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
    }
}

/// A credential that passed structural validation.
#[derive(Debug, Clone)]
pub struct Credential {
    raw: String,
    payload: Option<Value>,
}

impl Credential {
    /// Parse a raw token.
    ///
    /// Returns `None` for anything that is not well-formed: a malformed
    /// credential is treated as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_structurally_valid(raw) {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            payload: decode_payload(raw).ok(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded payload, when it is JSON.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn claims(&self) -> Option<Claims> {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match &self.payload {
            Some(payload) => payload_expired_at(payload, now_ms),
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

/// Check that `token` has exactly three non-empty base64url segments.
pub fn is_structurally_valid(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && BASE64URL.decode(part).is_ok())
}

/// Check whether `token` has expired as of now.
///
/// An undecodable payload counts as expired. A payload without an `exp`
/// claim never expires.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis())
}

/// Check whether `token` has expired as of `now_ms` (milliseconds since the
/// Unix epoch).
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode_payload(token) {
        Ok(payload) => payload_expired_at(&payload, now_ms),
        Err(e) => {
            tracing::debug!(error = %e, "Credential payload undecodable, treating as expired");
            true
        }
    }
}

/// Decode the payload segment into typed claims.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let payload = decode_payload(token)?;
    Ok(serde_json::from_value(payload)?)
}

fn decode_payload(token: &str) -> Result<Value> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::MalformedCredential("missing payload segment".to_string()))?;
    let bytes = BASE64URL
        .decode(segment)
        .map_err(|e| Error::MalformedCredential(format!("payload is not base64url: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn payload_expired_at(payload: &Value, now_ms: i64) -> bool {
    match payload.get("exp").and_then(numeric_claim) {
        Some(exp) => now_ms >= exp.saturating_mul(1000),
        None => false,
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        BASE64URL.encode(serde_json::to_vec(value).unwrap())
    }

    fn token_with(payload: Value) -> String {
        format!("{}.{}.c2lnbmF0dXJl", encode(&json!({"alg": "HS256"})), encode(&payload))
    }

    fn now_secs() -> i64 {
        Utc::now().timestamp()
    }

    #[test]
    fn test_wrong_part_count_is_invalid() {
        let good = token_with(json!({}));
        let segment = good.split('.').next().unwrap();
        for parts in [0usize, 1, 2, 4, 5] {
            let candidate = vec![segment; parts].join(".");
            assert!(!is_structurally_valid(&candidate), "{parts} parts");
        }
    }

    #[test]
    fn test_empty_part_is_invalid() {
        assert!(!is_structurally_valid("abc..def"));
        assert!(!is_structurally_valid(".abc.def"));
        assert!(!is_structurally_valid(""));
    }

    #[test]
    fn test_non_base64_part_is_invalid() {
        assert!(!is_structurally_valid("abc.d$f.ghi"));
        assert!(!is_structurally_valid("abc.def.g h"));
    }

    #[test]
    fn test_well_formed_token_is_valid() {
        assert!(is_structurally_valid(&token_with(json!({"sub": "1"}))));
        // Padding is tolerated.
        assert!(is_structurally_valid("eyJ9.eyJ9.c2lnbg=="));
    }

    #[test]
    fn test_no_expiry_claim_never_expires() {
        assert!(!is_expired(&token_with(json!({"sub": "1"}))));
        assert!(!is_expired(&token_with(json!({"exp": null}))));
        assert!(!is_expired(&token_with(json!(5))));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        assert!(is_expired(&token_with(json!({"exp": now_secs() - 1}))));
    }

    #[test]
    fn test_future_expiry_is_not_expired() {
        assert!(!is_expired(&token_with(json!({"exp": now_secs() + 3600}))));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let token = token_with(json!({"exp": 1_000}));
        assert!(!is_expired_at(&token, 999_999));
        assert!(is_expired_at(&token, 1_000_000));
    }

    #[test]
    fn test_float_expiry() {
        let token = token_with(json!({"exp": 1_000.5}));
        assert!(is_expired_at(&token, 1_000_000));
    }

    #[test]
    fn test_undecodable_payload_is_expired() {
        assert!(is_expired("eyJ9.!!!.c2ln"));
        // base64url but not JSON
        assert!(is_expired("eyJ9.bm90LWpzb24.c2ln"));
        assert!(is_expired("no-dots"));
    }

    #[test]
    fn test_decode_claims() {
        let token = token_with(json!({"sub": "42", "email": "ada@example.com", "exp": 1_700_000_000, "role": "teller"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.additional_claims["role"], json!("teller"));
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_credential_parse() {
        assert!(Credential::parse("a.b").is_none());

        let raw = token_with(json!({"exp": now_secs() + 60}));
        let credential = Credential::parse(&raw).unwrap();
        assert_eq!(credential.raw(), raw);
        assert!(!credential.is_expired());
        assert!(credential.claims().unwrap().exp.is_some());
    }
}
