use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::IssueConfig;
use crate::error::IssuerError;
use crate::jwk::Jwk;
use crate::jwt::{self, Claims, Token};
use crate::keys::{self, kid_for_timestamp, PrivateKey};

/// A freshly minted token together with what went into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: Token,
    pub claims: Claims,
    pub kid: String,
}

/// Load the configured key, build claims stamped at `now` and sign them.
///
/// Claims and algorithm are checked before the key file is read. The key is
/// dropped as soon as the signature exists.
pub fn issue_token(config: &IssueConfig, now: DateTime<Utc>) -> Result<IssuedToken, IssuerError> {
    let claims = jwt::build_claims(
        &config.subject,
        &config.issuer,
        &config.audience,
        config.lifetime_seconds,
        now,
    )?;
    jwt::resolve_algorithm(&config.algorithm)?;

    let (token, kid) = {
        let key = keys::load_private_key(&config.key_path)?;
        let kid = resolve_kid(config, &key, claims.iat);
        let token = jwt::sign(&claims, &key, &config.algorithm, &kid)?;
        (token, kid)
    };

    tracing::info!(kid = %kid, sub = %claims.sub, exp = claims.exp, "Issued token");

    Ok(IssuedToken { token, claims, kid })
}

/// Pick the header `kid`: an explicit one, else the kid of the `jwk.json`
/// beside the key when it describes that key, else `key-<iat>`.
pub fn resolve_kid(config: &IssueConfig, key: &PrivateKey, iat: i64) -> String {
    if let Some(kid) = &config.kid {
        return kid.clone();
    }

    let jwk_path = config.sibling_jwk_path();
    if jwk_path.is_file() {
        match Jwk::read_from(&jwk_path).and_then(|jwk| Ok((jwk.to_public_key()?, jwk.kid))) {
            Ok((public_key, kid)) if public_key == key.public_key() => return kid,
            Ok(_) => tracing::warn!(
                path = %jwk_path.display(),
                "JWK does not match the signing key, ignoring its kid"
            ),
            Err(e) => tracing::warn!(path = %jwk_path.display(), "Ignoring unreadable JWK: {e}"),
        }
    }

    kid_for_timestamp(iat)
}

/// Write the raw compact token to `path`.
pub fn write_token(path: &Path, token: &Token) -> Result<(), IssuerError> {
    fs::write(path, token.as_str()).map_err(|e| IssuerError::io(path, e))?;
    tracing::info!(path = %path.display(), "Saved token");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyDirConfig;
    use crate::keys::{generate, write_artifacts};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn setup() -> (TempDir, KeyDirConfig, IssueConfig) {
        let temp_dir = TempDir::new().unwrap();
        let key_dir = KeyDirConfig::new(temp_dir.path().join("jwk"));
        let config = IssueConfig {
            key_path: key_dir.private_key_path(),
            ..IssueConfig::default()
        };
        (temp_dir, key_dir, config)
    }

    #[test]
    fn test_issue_token_uses_kid_from_jwk() {
        let (_temp, key_dir, config) = setup();
        let key_pair = generate().unwrap();
        write_artifacts(&key_pair, &key_dir).unwrap();

        let issued = issue_token(&config, at(1_700_000_000)).unwrap();

        assert_eq!(issued.kid, key_pair.kid());
        assert_eq!(issued.claims.iat, 1_700_000_000);
        assert_eq!(issued.claims.exp, 1_700_003_600);
    }

    #[test]
    fn test_issue_token_explicit_kid_wins() {
        let (_temp, key_dir, mut config) = setup();
        write_artifacts(&generate().unwrap(), &key_dir).unwrap();
        config.kid = Some("rotated-7".to_string());

        let issued = issue_token(&config, at(1_700_000_000)).unwrap();
        assert_eq!(issued.kid, "rotated-7");
    }

    #[test]
    fn test_kid_falls_back_to_timestamp_without_jwk() {
        let (_temp, key_dir, config) = setup();
        write_artifacts(&generate().unwrap(), &key_dir).unwrap();
        fs::remove_file(key_dir.jwk_path()).unwrap();

        let issued = issue_token(&config, at(1_700_000_123)).unwrap();
        assert_eq!(issued.kid, "key-1700000123");
    }

    #[test]
    fn test_kid_ignores_jwk_of_other_key() {
        let (_temp, key_dir, config) = setup();
        let key_pair = generate().unwrap();
        write_artifacts(&key_pair, &key_dir).unwrap();

        let stranger = generate().unwrap().to_jwk();
        fs::write(key_dir.jwk_path(), stranger.to_pretty_json().unwrap()).unwrap();

        let kid = resolve_kid(&config, &key_pair.private_key(), 42);
        assert_eq!(kid, "key-42");
    }

    #[test]
    fn test_issue_token_missing_key() {
        let (_temp, _key_dir, config) = setup();

        let result = issue_token(&config, at(1_700_000_000));
        assert!(matches!(result, Err(IssuerError::KeyNotFound(_))));
    }

    #[test]
    fn test_issue_token_rejects_zero_lifetime_before_loading_key() {
        let config = IssueConfig {
            key_path: PathBuf::from("/nonexistent/private.pem"),
            lifetime_seconds: 0,
            ..IssueConfig::default()
        };

        let result = issue_token(&config, at(1_700_000_000));
        assert!(matches!(result, Err(IssuerError::InvalidLifetime(0))));
    }

    #[test]
    fn test_issue_token_rejects_algorithm_before_loading_key() {
        let config = IssueConfig {
            key_path: PathBuf::from("/nonexistent/private.pem"),
            algorithm: "HS256".to_string(),
            ..IssueConfig::default()
        };

        let result = issue_token(&config, at(1_700_000_000));
        assert!(matches!(result, Err(IssuerError::AlgorithmMismatch { .. })));
    }

    #[test]
    fn test_write_token() {
        let (temp, key_dir, config) = setup();
        write_artifacts(&generate().unwrap(), &key_dir).unwrap();
        let issued = issue_token(&config, at(1_700_000_000)).unwrap();

        let out = temp.path().join("token.jwt");
        write_token(&out, &issued.token).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), issued.token.as_str());
    }
}
