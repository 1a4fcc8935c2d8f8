use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY_DIR: &str = "jwk";
pub const PRIVATE_KEY_FILE: &str = "private.pem";
pub const PUBLIC_KEY_FILE: &str = "public.pem";
pub const JWK_FILE: &str = "jwk.json";

pub const DEFAULT_ALGORITHM: &str = "ES256";
pub const DEFAULT_SUBJECT: &str = "user123";
pub const DEFAULT_ISSUER: &str = "https://example.com";
pub const DEFAULT_AUDIENCE: &str = "web_server";
pub const DEFAULT_LIFETIME_SECONDS: i64 = 3600;

/// Where the key pair artifacts live and whether existing ones may be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDirConfig {
    pub dir: PathBuf,
    pub overwrite: bool,
}

impl KeyDirConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Reads `ES256_MINT_KEY_DIR`, falling back to `jwk`.
    pub fn from_env() -> Self {
        let dir = env::var("ES256_MINT_KEY_DIR").unwrap_or_else(|_| DEFAULT_KEY_DIR.to_string());
        Self::new(dir)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    pub fn jwk_path(&self) -> PathBuf {
        self.dir.join(JWK_FILE)
    }

    pub fn artifact_paths(&self) -> [PathBuf; 3] {
        [
            self.private_key_path(),
            self.public_key_path(),
            self.jwk_path(),
        ]
    }
}

impl Default for KeyDirConfig {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_DIR)
    }
}

/// Everything one token issuance needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueConfig {
    pub key_path: PathBuf,
    pub algorithm: String,
    pub subject: String,
    pub issuer: String,
    pub audience: String,
    pub lifetime_seconds: i64,
    pub kid: Option<String>,
    pub output: Option<PathBuf>,
}

impl IssueConfig {
    /// `jwk.json` next to the configured private key.
    pub fn sibling_jwk_path(&self) -> PathBuf {
        self.key_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(JWK_FILE)
    }
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            key_path: KeyDirConfig::default().private_key_path(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            lifetime_seconds: DEFAULT_LIFETIME_SECONDS,
            kid: None,
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_dir_paths() {
        let config = KeyDirConfig::new("/tmp/keys");

        assert_eq!(config.private_key_path(), PathBuf::from("/tmp/keys/private.pem"));
        assert_eq!(config.public_key_path(), PathBuf::from("/tmp/keys/public.pem"));
        assert_eq!(config.jwk_path(), PathBuf::from("/tmp/keys/jwk.json"));
        assert!(!config.overwrite);
    }

    #[test]
    fn test_key_dir_from_env() {
        env::set_var("ES256_MINT_KEY_DIR", "/var/lib/keys");
        assert_eq!(KeyDirConfig::from_env().dir, PathBuf::from("/var/lib/keys"));

        env::remove_var("ES256_MINT_KEY_DIR");
        assert_eq!(KeyDirConfig::from_env(), KeyDirConfig::default());
    }

    #[test]
    fn test_issue_config_defaults() {
        let config = IssueConfig::default();

        assert_eq!(config.key_path, PathBuf::from("jwk/private.pem"));
        assert_eq!(config.algorithm, "ES256");
        assert_eq!(config.subject, "user123");
        assert_eq!(config.issuer, "https://example.com");
        assert_eq!(config.audience, "web_server");
        assert_eq!(config.lifetime_seconds, 3600);
        assert!(config.kid.is_none());
        assert!(config.output.is_none());
    }

    #[test]
    fn test_sibling_jwk_path() {
        let config = IssueConfig {
            key_path: PathBuf::from("keys/prod/private.pem"),
            ..IssueConfig::default()
        };
        assert_eq!(config.sibling_jwk_path(), PathBuf::from("keys/prod/jwk.json"));

        let bare = IssueConfig {
            key_path: PathBuf::from("private.pem"),
            ..IssueConfig::default()
        };
        assert_eq!(bare.sibling_jwk_path(), PathBuf::from("jwk.json"));
    }
}
