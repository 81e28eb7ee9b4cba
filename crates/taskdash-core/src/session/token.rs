//! Bearer token validity checks.
//!
//! A token is usable only if it has the three dot-separated segments of a
//! signed token and its payload decodes to a JSON object whose `exp` claim (if
//! present) is still in the future. The signature is not verified; the server
//! remains the authority.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde_json::Value;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProblem {
    /// Not exactly three dot-separated segments.
    Malformed,
    /// Payload segment is not base64url-encoded JSON.
    UndecodablePayload,
    /// `exp` claim is in the past.
    Expired,
}

impl TokenProblem {
    pub fn describe(self) -> &'static str {
        match self {
            TokenProblem::Malformed => "token is not a three-segment signed token",
            TokenProblem::UndecodablePayload => "token payload could not be decoded",
            TokenProblem::Expired => "token has expired",
        }
    }
}

/// Claims the client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenClaims {
    /// Expiry, seconds since epoch.
    pub exp: Option<i64>,
    pub sub: Option<String>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(i64::MAX)
}

/// Decodes the payload segment without checking expiry.
///
/// # Errors
/// Returns the structural problem with the token.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenProblem> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenProblem::Malformed);
    }

    let payload = segments[1];
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|_| TokenProblem::UndecodablePayload)?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|_| TokenProblem::UndecodablePayload)?;
    let Value::Object(claims) = value else {
        return Err(TokenProblem::UndecodablePayload);
    };

    let exp = claims.get("exp").and_then(|exp| match exp {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });
    let sub = claims
        .get("sub")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    Ok(TokenClaims { exp, sub })
}

/// Validates a token against the current time.
///
/// # Errors
/// Returns why the token cannot be used.
pub fn validate(token: &str) -> Result<TokenClaims, TokenProblem> {
    validate_at(token, now_secs())
}

/// Validates a token against an explicit clock (seconds since epoch).
///
/// # Errors
/// Returns why the token cannot be used.
pub fn validate_at(token: &str, now: i64) -> Result<TokenClaims, TokenProblem> {
    let claims = decode_claims(token)?;
    match claims.exp {
        Some(exp) if exp < now => Err(TokenProblem::Expired),
        _ => Ok(claims),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_segment_count_must_be_three() {
        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            assert_eq!(
                validate_at(token, 0),
                Err(TokenProblem::Malformed),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let token = token_with(r#"{"sub":"42","exp":2000}"#);
        let claims = validate_at(&token, 1000).unwrap();
        assert_eq!(claims.exp, Some(2000));
        assert_eq!(claims.sub.as_deref(), Some("42"));
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let token = token_with(r#"{"exp":999}"#);
        assert_eq!(validate_at(&token, 1000), Err(TokenProblem::Expired));
    }

    #[test]
    fn test_missing_expiry_is_valid() {
        let token = token_with(r#"{"sub":"abc"}"#);
        assert_eq!(validate_at(&token, i64::MAX).unwrap().exp, None);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = URL_SAFE.encode(r#"{"exp":5}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(validate_at(&token, 1).unwrap().exp, Some(5));
    }

    #[test]
    fn test_non_json_payload_is_rejected() {
        assert_eq!(
            validate_at("x.y.z", 0),
            Err(TokenProblem::UndecodablePayload)
        );
        let token = token_with("[1,2,3]");
        assert_eq!(validate_at(&token, 0), Err(TokenProblem::UndecodablePayload));
    }
}
