//! CLI for signing key material
//!
//! `generate` prints a fresh value for `SIGNING_KEY`. `check` confirms the
//! configured key loads the same way the server loads it.

use anyhow::{Context, Result};
use auth_core::domains::auth::{encode_signing_key, SigningKeys};
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

#[derive(Parser)]
#[command(name = "keygen")]
#[command(about = "Ed25519 signing key tool for the authorization service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key and print it as base64 PKCS#8 PEM
    Generate,

    /// Load SIGNING_KEY from the environment (or --key) and report whether it is usable
    Check {
        #[arg(long)]
        key: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate => {
            let signing_key = SigningKey::generate(&mut OsRng);
            let encoded = encode_signing_key(&signing_key).context("Failed to encode key")?;
            println!("{}", encoded);
        }
        Commands::Check { key } => {
            let _ = dotenvy::dotenv();
            let encoded = match key {
                Some(key) => key,
                None => std::env::var("SIGNING_KEY").context("SIGNING_KEY must be set")?,
            };
            SigningKeys::from_encoded(&encoded).context("SIGNING_KEY is not a usable Ed25519 key")?;
            println!("SIGNING_KEY ok");
        }
    }

    Ok(())
}
