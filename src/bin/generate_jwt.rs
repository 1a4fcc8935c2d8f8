use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use es256_mint::{
    config::{
        IssueConfig, KeyDirConfig, DEFAULT_ALGORITHM, DEFAULT_AUDIENCE, DEFAULT_ISSUER,
        DEFAULT_LIFETIME_SECONDS, DEFAULT_SUBJECT,
    },
    init_tracing,
    issuer::{issue_token, write_token},
    jwt::decode_unverified,
    IssuerError,
};

/// Sign a test JWT with an EC P-256 private key.
#[derive(Parser)]
#[command(name = "generate_jwt")]
#[command(version)]
struct Cli {
    /// Private key path
    #[arg(
        long,
        env = "ES256_MINT_KEY",
        default_value_os_t = KeyDirConfig::default().private_key_path()
    )]
    key: PathBuf,

    /// Signature algorithm
    #[arg(long, default_value = DEFAULT_ALGORITHM)]
    alg: String,

    /// Subject (sub)
    #[arg(short, long, default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Issuer (iss)
    #[arg(short, long, default_value = DEFAULT_ISSUER)]
    issuer: String,

    /// Audience (aud)
    #[arg(short, long, default_value = DEFAULT_AUDIENCE)]
    audience: String,

    /// Lifetime in seconds
    #[arg(short, long, default_value_t = DEFAULT_LIFETIME_SECONDS, allow_negative_numbers = true)]
    expires: i64,

    /// Write the raw token to this file as well as stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Key id for the token header (defaults to the kid in jwk.json beside the key)
    #[arg(long)]
    kid: Option<String>,
}

impl From<Cli> for IssueConfig {
    fn from(cli: Cli) -> Self {
        IssueConfig {
            key_path: cli.key,
            algorithm: cli.alg,
            subject: cli.subject,
            issuer: cli.issuer,
            audience: cli.audience,
            lifetime_seconds: cli.expires,
            kid: cli.kid,
            output: cli.output,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let config = IssueConfig::from(Cli::parse());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &IssueConfig) -> Result<(), IssuerError> {
    let issued = issue_token(config, Utc::now())?;
    // Decode before writing anything so a bad token never reaches disk.
    let decoded = decode_unverified(&issued.token)?;

    println!("Generated JWT:");
    println!("{}", issued.token);

    if let Some(output) = &config.output {
        write_token(output, &issued.token)?;
        println!("\nSaved JWT to {}", output.display());
    }

    println!("\nDecoded payload (signature not verified):");
    println!("{}", decoded.to_pretty_json()?);

    Ok(())
}
