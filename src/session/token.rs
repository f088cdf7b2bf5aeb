//! Unverified JWT payload decoding. The console never checks signatures; it
//! only reads the `exp` claim to know when to stop using a token. Tokens that
//! are not three-part JWTs are treated as opaque and yield no claims.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::Value;

/// Decodes the payload segment of a JWT-shaped token.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Value> {
    let mut parts = token.trim().split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    // Some issuers pad or use the standard alphabet; normalise to unpadded url-safe.
    let payload: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = Base64UrlUnpadded::decode_vec(&payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.is_object().then_some(claims)
}

/// Returns the `exp` claim (seconds since epoch) when present and numeric.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn expiry_seconds(token: &str) -> Option<i64> {
    let claims = decode_claims(token)?;
    let exp = claims.get("exp")?;
    exp.as_i64()
        .or_else(|| exp.as_f64().filter(|v| v.is_finite()).map(|v| v.floor() as i64))
}

/// Returns the `exp` claim converted to epoch milliseconds.
#[must_use]
pub fn expiry_millis(token: &str) -> Option<i64> {
    expiry_seconds(token).map(|seconds| seconds.saturating_mul(1000))
}
