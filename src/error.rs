use std::fmt;
use std::path::PathBuf;

/// Unified error type for key generation and token issuance.
///
/// `EntropyFailure`, `AlgorithmMismatch` and `SigningFailure` are fatal.
/// `KeyNotFound` and `KeyFormat` are fixed by the caller supplying a usable
/// key file. Nothing here is ever retried.
#[derive(Debug)]
pub enum IssuerError {
    EntropyFailure(String),
    KeyNotFound(PathBuf),
    KeyFormat(String),
    AlgorithmMismatch { requested: String, expected: String },
    SigningFailure(String),
    InvalidLifetime(i64),
    ArtifactExists(PathBuf),
    Io { path: PathBuf, message: String },
    Serialization(String),
}

impl IssuerError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        IssuerError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for IssuerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuerError::EntropyFailure(msg) => write!(f, "Entropy source failure: {msg}"),
            IssuerError::KeyNotFound(path) => {
                write!(f, "Private key not found: {}", path.display())
            }
            IssuerError::KeyFormat(msg) => write!(f, "Unsupported key format: {msg}"),
            IssuerError::AlgorithmMismatch { requested, expected } => {
                write!(f, "Algorithm mismatch: key requires {expected}, got {requested}")
            }
            IssuerError::SigningFailure(msg) => write!(f, "Signing failed: {msg}"),
            IssuerError::InvalidLifetime(secs) => {
                write!(f, "Token lifetime must be a positive number of seconds, got {secs}")
            }
            IssuerError::ArtifactExists(path) => write!(
                f,
                "Refusing to overwrite existing key artifact: {}",
                path.display()
            ),
            IssuerError::Io { path, message } => {
                write!(f, "I/O error on {}: {message}", path.display())
            }
            IssuerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for IssuerError {}

impl From<serde_json::Error> for IssuerError {
    fn from(err: serde_json::Error) -> Self {
        IssuerError::Serialization(err.to_string())
    }
}
