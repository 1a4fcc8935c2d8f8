use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use p256::elliptic_curve::zeroize::Zeroizing;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::{PublicKey, SecretKey};

use crate::config::KeyDirConfig;
use crate::error::IssuerError;
use crate::jwk::Jwk;

const SCALAR_LENGTH: usize = 32;

#[cfg(unix)]
const PRIVATE_KEY_MODE: u32 = 0o600;
#[cfg(unix)]
const KEY_DIR_MODE: u32 = 0o700;

/// A freshly generated P-256 key pair.
///
/// The `kid` is fixed at generation time so every artifact exported from one
/// key pair carries the same identifier.
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret: SecretKey,
    generated_at: DateTime<Utc>,
    kid: String,
}

/// PEM encodings of a key pair. The private half is wiped on drop.
pub struct PemPair {
    pub private_pem: Zeroizing<String>,
    pub public_pem: String,
}

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyArtifacts {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub jwk_path: PathBuf,
    pub jwk: Jwk,
}

impl KeyPair {
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Signing handle for the private half, for issuing without a round trip
    /// through the filesystem.
    pub fn private_key(&self) -> PrivateKey {
        PrivateKey {
            secret: self.secret.clone(),
        }
    }

    /// Unencrypted PKCS#8 private key and SubjectPublicKeyInfo public key.
    pub fn to_pem(&self) -> Result<PemPair, IssuerError> {
        let private_pem = self
            .secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IssuerError::Serialization(format!("Failed to encode private key: {e}")))?;

        let public_pem = self
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IssuerError::Serialization(format!("Failed to encode public key: {e}")))?;

        Ok(PemPair {
            private_pem,
            public_pem,
        })
    }

    pub fn to_jwk(&self) -> Jwk {
        Jwk::from_public_key(&self.public_key(), &self.kid)
    }
}

/// Generate a new P-256 key pair from the OS entropy source.
pub fn generate() -> Result<KeyPair, IssuerError> {
    generate_at(Utc::now())
}

/// Same as [`generate`] with an explicit generation time, which also fixes the `kid`.
pub fn generate_at(generated_at: DateTime<Utc>) -> Result<KeyPair, IssuerError> {
    let secret = random_secret_key()?;

    Ok(KeyPair {
        secret,
        generated_at,
        kid: kid_for_timestamp(generated_at.timestamp()),
    })
}

pub fn kid_for_timestamp(timestamp: i64) -> String {
    format!("key-{timestamp}")
}

fn random_secret_key() -> Result<SecretKey, IssuerError> {
    loop {
        let mut bytes = Zeroizing::new([0u8; SCALAR_LENGTH]);
        getrandom::fill(&mut bytes[..])
            .map_err(|e| IssuerError::EntropyFailure(e.to_string()))?;

        // Zero or >= the group order: draw again.
        if let Ok(secret) = SecretKey::from_slice(&bytes[..]) {
            return Ok(secret);
        }
    }
}

/// Write `private.pem`, `public.pem` and `jwk.json` into the configured directory.
///
/// All three artifacts are encoded before anything touches the disk. Existing
/// artifacts are only replaced when `config.overwrite` is set.
pub fn write_artifacts(
    key_pair: &KeyPair,
    config: &KeyDirConfig,
) -> Result<KeyArtifacts, IssuerError> {
    let pems = key_pair.to_pem()?;
    let jwk = key_pair.to_jwk();
    let jwk_json = jwk.to_pretty_json()?;

    if let Some(existing) = config.artifact_paths().into_iter().find(|p| p.exists()) {
        if !config.overwrite {
            return Err(IssuerError::ArtifactExists(existing));
        }
        tracing::warn!(
            path = %existing.display(),
            "Overwriting existing key artifacts"
        );
    }

    create_key_dir(&config.dir)?;

    let private_key_path = config.private_key_path();
    write_file(&private_key_path, pems.private_pem.as_bytes(), true)?;
    tracing::info!(path = %private_key_path.display(), "Saved private key");

    let public_key_path = config.public_key_path();
    write_file(&public_key_path, pems.public_pem.as_bytes(), false)?;
    tracing::info!(path = %public_key_path.display(), "Saved public key");

    let jwk_path = config.jwk_path();
    write_file(&jwk_path, jwk_json.as_bytes(), false)?;
    tracing::info!(path = %jwk_path.display(), kid = %jwk.kid, "Saved JWK");

    Ok(KeyArtifacts {
        private_key_path,
        public_key_path,
        jwk_path,
        jwk,
    })
}

fn create_key_dir(dir: &Path) -> Result<(), IssuerError> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| IssuerError::io(dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(KEY_DIR_MODE))
            .map_err(|e| IssuerError::io(dir, e))?;
    }

    Ok(())
}

fn write_file(path: &Path, contents: &[u8], secret: bool) -> Result<(), IssuerError> {
    let mut file = File::create(path).map_err(|e| IssuerError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if secret {
            fs::set_permissions(path, fs::Permissions::from_mode(PRIVATE_KEY_MODE))
                .map_err(|e| IssuerError::io(path, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = secret;

    file.write_all(contents)
        .map_err(|e| IssuerError::io(path, e))?;
    file.sync_all().map_err(|e| IssuerError::io(path, e))?;

    Ok(())
}

/// A P-256 signing key loaded for one issuance. Key material is zeroized on drop.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Parse a PKCS#8 (`PRIVATE KEY`) or SEC1 (`EC PRIVATE KEY`) PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, IssuerError> {
        let secret = SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| SecretKey::from_sec1_pem(pem))
            .map_err(|e| IssuerError::KeyFormat(format!("not a P-256 private key: {e}")))?;

        Ok(Self { secret })
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub(crate) fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>, IssuerError> {
        let document = self
            .secret
            .to_pkcs8_der()
            .map_err(|e| {
                IssuerError::SigningFailure(format!("Failed to encode signing key: {e}"))
            })?;

        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }
}

/// Load the private key at `path`.
///
/// Fails with `KeyNotFound` when the path is not a readable file and with
/// `KeyFormat` when its contents are not a supported P-256 key container.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<PrivateKey, IssuerError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(IssuerError::KeyNotFound(path.to_path_buf()));
    }

    let bytes = Zeroizing::new(
        fs::read(path).map_err(|_| IssuerError::KeyNotFound(path.to_path_buf()))?,
    );

    let pem = std::str::from_utf8(&bytes)
        .map_err(|e| IssuerError::KeyFormat(format!("Invalid PEM encoding: {e}")))?;

    let key = PrivateKey::from_pem(pem)?;
    tracing::info!(path = %path.display(), "Loaded private key");

    Ok(key)
}
