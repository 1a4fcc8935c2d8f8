use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::IssuerError;
use crate::keys::PrivateKey;

pub const TOKEN_TYPE: &str = "JWT";

/// The only algorithm a P-256 key can sign with.
pub const KEY_ALGORITHM: Algorithm = Algorithm::ES256;

/// Standard identity claims, serialized in this field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed compact token: `header.payload.signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub(crate) fn new(compact: String) -> Self {
        Self(compact)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Header and payload of a token read WITHOUT checking its signature.
///
/// Only meant for displaying a token this process just minted. Nothing in
/// here has been authenticated.
#[derive(Debug, Clone)]
pub struct UnverifiedClaims {
    header: Header,
    claims: Claims,
}

impl UnverifiedClaims {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn unverified_claims(&self) -> &Claims {
        &self.claims
    }

    pub fn to_pretty_json(&self) -> Result<String, IssuerError> {
        Ok(serde_json::to_string_pretty(&self.claims)?)
    }
}

/// Build the claim set for one token.
///
/// `iat` is `now` truncated to whole seconds and `exp = iat + lifetime_seconds`.
/// A lifetime of zero or less is rejected.
pub fn build_claims(
    subject: &str,
    issuer: &str,
    audience: &str,
    lifetime_seconds: i64,
    now: DateTime<Utc>,
) -> Result<Claims, IssuerError> {
    if lifetime_seconds <= 0 {
        return Err(IssuerError::InvalidLifetime(lifetime_seconds));
    }

    let iat = now.timestamp();
    let exp = iat
        .checked_add(lifetime_seconds)
        .ok_or(IssuerError::InvalidLifetime(lifetime_seconds))?;

    Ok(Claims {
        sub: subject.to_string(),
        iss: issuer.to_string(),
        aud: audience.to_string(),
        iat,
        exp,
    })
}

/// Map an algorithm name to the key's algorithm. Anything but ES256 is a
/// configuration error: no verifier would accept the resulting token.
pub fn resolve_algorithm(name: &str) -> Result<Algorithm, IssuerError> {
    match Algorithm::from_str(name) {
        Ok(alg) if alg == KEY_ALGORITHM => Ok(alg),
        _ => Err(IssuerError::AlgorithmMismatch {
            requested: name.to_string(),
            expected: format!("{KEY_ALGORITHM:?}"),
        }),
    }
}

/// Sign `claims` with `key`, producing a compact token whose header is
/// `{"typ":"JWT","alg":"ES256","kid":<kid>}`.
pub fn sign(
    claims: &Claims,
    key: &PrivateKey,
    algorithm: &str,
    kid: &str,
) -> Result<Token, IssuerError> {
    let alg = resolve_algorithm(algorithm)?;

    let mut header = Header::new(alg);
    header.typ = Some(TOKEN_TYPE.to_string());
    header.kid = Some(kid.to_string());

    let der = key.to_pkcs8_der()?;
    let encoding_key = EncodingKey::from_ec_der(&der);

    let compact = jsonwebtoken::encode(&header, claims, &encoding_key)
        .map_err(|e| IssuerError::SigningFailure(format!("Failed to sign token: {e}")))?;

    tracing::debug!(kid, sub = %claims.sub, exp = claims.exp, "Signed token");

    Ok(Token::new(compact))
}

/// Decode header and payload without checking the signature or expiry.
///
/// Never use this on tokens received from elsewhere.
pub fn decode_unverified(token: &Token) -> Result<UnverifiedClaims, IssuerError> {
    let segments = token.segments();
    let [_, payload, _] = segments.as_slice() else {
        return Err(IssuerError::Serialization(format!(
            "token must have 3 segments, got {}",
            segments.len()
        )));
    };

    let header = jsonwebtoken::decode_header(token.as_str())
        .map_err(|e| IssuerError::Serialization(format!("Invalid token header: {e}")))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| IssuerError::Serialization(format!("Invalid token payload: {e}")))?;
    let claims: Claims = serde_json::from_slice(&payload)?;

    Ok(UnverifiedClaims { header, claims })
}
