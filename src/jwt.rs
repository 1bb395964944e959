use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::error::Error;

/// Registered claims read from an unverified JWT payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, JsonValue>,
}

/// Decodes the payload of a JWT without verifying its signature.
///
/// Only useful as a client-side hint. The server remains the authority on
/// whether a token is valid.
///
/// # Errors
///
/// Returns `Error::Token` if the token is not three dot-separated segments or
/// the payload is not base64url-encoded JSON.
pub fn decode_unverified(token: &str) -> Result<UnverifiedClaims, Error> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::Token("invalid JWT format".into()));
    };

    // Some issuers pad their segments even though RFC 7515 says not to.
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| Error::Token("invalid base64 in JWT payload".into()))?;

    serde_json::from_slice(&payload_bytes)
        .map_err(|e| Error::Token(format!("invalid JWT payload: {e}")))
}

/// Returns whether the token's `exp` claim is at or before `now`.
///
/// A token without `exp` never expires.
///
/// # Errors
///
/// Returns `Error::Token` if the token cannot be decoded.
pub fn is_expired_at(token: &str, now: OffsetDateTime) -> Result<bool, Error> {
    let claims = decode_unverified(token)?;
    Ok(claims.exp.is_some_and(|exp| exp <= now.unix_timestamp()))
}

/// [`is_expired_at`] against the current system time.
///
/// # Errors
///
/// Returns `Error::Token` if the token cannot be decoded.
pub fn is_expired(token: &str) -> Result<bool, Error> {
    is_expired_at(token, OffsetDateTime::now_utc())
}

/// Builds unsigned JWTs for tests.
#[cfg(test)]
pub(crate) fn test_token(exp: Option<i64>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = match exp {
        Some(exp) => serde_json::json!({ "exp": exp, "data": { "userId": "u1" } }),
        None => serde_json::json!({ "data": { "userId": "u1" } }),
    };
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{payload}.signature")
}

/// A token that expired an hour ago.
#[cfg(test)]
pub(crate) fn expired_token() -> String {
    test_token(Some(OffsetDateTime::now_utc().unix_timestamp() - 3600))
}

/// A token that expires in an hour.
#[cfg(test)]
pub(crate) fn fresh_token() -> String {
    test_token(Some(OffsetDateTime::now_utc().unix_timestamp() + 3600))
}
