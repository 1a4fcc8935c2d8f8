use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use serde::{Deserialize, Serialize};

use crate::error::IssuerError;

pub const KEY_TYPE: &str = "EC";
pub const CURVE: &str = "P-256";
pub const KEY_USE: &str = "sig";
pub const ALGORITHM: &str = "ES256";

const COORDINATE_LENGTH: usize = 32;
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// EC public key in JWK form (RFC 7517 / RFC 7518 §6.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    pub kid: String,
}

impl Jwk {
    pub fn from_public_key(public_key: &PublicKey, kid: &str) -> Self {
        let point = public_key.to_encoded_point(false);
        // 0x04 || x || y, coordinates already left-padded to 32 bytes
        let bytes = point.as_bytes();
        let (x, y) = bytes[1..].split_at(COORDINATE_LENGTH);

        Self {
            kty: KEY_TYPE.to_string(),
            crv: CURVE.to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
            key_use: KEY_USE.to_string(),
            alg: ALGORITHM.to_string(),
            kid: kid.to_string(),
        }
    }

    /// Rebuild the public point, rejecting anything other than a P-256 key
    /// with two 32-byte coordinates on the curve.
    pub fn to_public_key(&self) -> Result<PublicKey, IssuerError> {
        if self.kty != KEY_TYPE || self.crv != CURVE {
            return Err(IssuerError::KeyFormat(format!(
                "expected {KEY_TYPE}/{CURVE} JWK, got {}/{}",
                self.kty, self.crv
            )));
        }

        let x = decode_coordinate("x", &self.x)?;
        let y = decode_coordinate("y", &self.y)?;

        let mut sec1 = Vec::with_capacity(1 + 2 * COORDINATE_LENGTH);
        sec1.push(SEC1_UNCOMPRESSED_TAG);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);

        PublicKey::from_sec1_bytes(&sec1)
            .map_err(|_| IssuerError::KeyFormat("JWK point is not on P-256".into()))
    }

    pub fn to_pretty_json(&self) -> Result<String, IssuerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, IssuerError> {
        serde_json::from_str(json).map_err(|e| IssuerError::KeyFormat(format!("Invalid JWK: {e}")))
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, IssuerError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| IssuerError::io(path, e))?;
        Self::from_json(&json)
    }
}

fn decode_coordinate(name: &str, encoded: &str) -> Result<Vec<u8>, IssuerError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| IssuerError::KeyFormat(format!("JWK {name} is not base64url: {e}")))?;

    if bytes.len() != COORDINATE_LENGTH {
        return Err(IssuerError::KeyFormat(format!(
            "JWK {name} must be {COORDINATE_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }

    Ok(bytes)
}
