use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use es256_mint::{
    config::KeyDirConfig,
    init_tracing,
    keys::{generate, write_artifacts},
    IssuerError,
};

/// Generate an EC P-256 key pair and save it as PEM and JWK.
#[derive(Parser)]
#[command(name = "generate_keys")]
#[command(version)]
struct Cli {
    /// Directory for private.pem, public.pem and jwk.json
    /// (defaults to ES256_MINT_KEY_DIR, then "jwk")
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Replace artifacts that already exist in the directory
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), IssuerError> {
    let config = cli
        .dir
        .map(KeyDirConfig::new)
        .unwrap_or_else(KeyDirConfig::from_env)
        .with_overwrite(cli.force);

    println!("Generating EC P-256 key pair...");
    let key_pair = generate()?;
    let artifacts = write_artifacts(&key_pair, &config)?;

    println!("Saved private key to {}", artifacts.private_key_path.display());
    println!("Saved public key to {}", artifacts.public_key_path.display());
    println!("Saved JWK to {}", artifacts.jwk_path.display());
    println!("Generated JWK:");
    println!("{}", artifacts.jwk.to_pretty_json()?);

    Ok(())
}
