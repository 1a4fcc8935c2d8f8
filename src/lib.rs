pub mod config;
pub mod error;
pub mod issuer;
pub mod jwk;
pub mod jwt;
pub mod keys;

pub use error::IssuerError;

/// Install the stderr log subscriber used by the binaries. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
