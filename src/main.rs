// src/main.rs

//! # DID Wallet - Command Line Entry Point
//!
//! Drives the wallet core from the terminal: identity lifecycle, credential
//! issuance, predicate verification and backups.
//!
//! ## Configuration
//! Read from `wallet.toml` (or `--config <file>`) and `WALLET_*` variables,
//! with `.env` loaded first:
//! - `WALLET_ENCRYPTION_KEY`: 64 hex chars, the at-rest AES-256 key (required)
//! - `WALLET_STORE_PATH`: encrypted store file (default `wallet-store.json`)
//! - `WALLET_ISSUER_URL` / `WALLET_VERIFIER_URL`: default protocol endpoints

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use did_wallet::{Predicate, Wallet, WalletConfig};
use log::debug;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "did-wallet", version, about = "Self-sovereign identity wallet", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new identity and print its recovery phrase.
    Create,

    /// Restore the identity behind a 12-word recovery phrase.
    Restore { phrase: String },

    /// Show the wallet's DID, address and DID document.
    Show,

    /// Request a credential from an issuer.
    Issue {
        #[arg(long)]
        issuer: Option<String>,
        /// Claims as a JSON object, e.g. '{"name":"Ada","dob":"2000-01-01"}'.
        #[arg(long)]
        claims: String,
    },

    /// Prove a predicate about a stored credential to a verifier.
    Verify {
        #[arg(long)]
        cred_id: String,
        #[arg(long)]
        verifier: Option<String>,
        #[arg(long, default_value = "over_18")]
        predicate: String,
    },

    /// List stored credentials.
    Credentials,

    /// List stored decision tokens.
    Tokens,

    /// Print a JSON backup of the identity (contains the private key).
    ExportBackup,

    /// Replace the wallet with the contents of a backup file.
    ImportBackup { file: PathBuf },

    /// Delete everything in the wallet.
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = WalletConfig::load(cli.config.as_deref()).context("loading configuration")?;
    debug!("configuration: {config:?}");

    let store = config
        .open_store()
        .with_context(|| format!("opening store at {}", config.store_path.display()))?;
    let wallet = Wallet::new(Arc::new(store), config.http_client()?);

    match cli.command {
        Commands::Create => {
            let (info, phrase) = wallet.create()?;
            println!("DID:     {}", info.did);
            println!("Address: {}", info.address);
            println!();
            println!("Recovery phrase (write it down, it is shown once):");
            println!("  {phrase}");
        }
        Commands::Restore { phrase } => {
            let info = wallet.restore_from_mnemonic(&phrase)?;
            println!("Restored {}", info.did);
        }
        Commands::Show => {
            let info = wallet.info()?;
            println!("DID:        {}", info.did);
            println!("Address:    {}", info.address);
            println!("Public key: {}", info.public_key);
            println!("Created:    {}", info.created_at);
            println!("{}", serde_json::to_string_pretty(&wallet.did_document()?)?);
        }
        Commands::Issue { issuer, claims } => {
            let Some(issuer) = issuer.or_else(|| config.issuer_url.clone()) else {
                bail!("no issuer given; pass --issuer or set WALLET_ISSUER_URL");
            };
            let claims: Value = serde_json::from_str(&claims).context("--claims is not JSON")?;
            if !claims.is_object() {
                bail!("--claims must be a JSON object");
            }
            let credential = wallet.issue(&issuer, claims).await?;
            println!("Issued {} ({}) by {}", credential.cred_id, credential.status, credential.issuer_did);
        }
        Commands::Verify {
            cred_id,
            verifier,
            predicate,
        } => {
            let Some(verifier) = verifier.or_else(|| config.verifier_url.clone()) else {
                bail!("no verifier given; pass --verifier or set WALLET_VERIFIER_URL");
            };
            let predicate: Predicate = predicate.parse()?;
            let token = wallet.verify(&cred_id, &verifier, predicate).await?;
            println!("Decision token: {}", token.decision_token);
            println!("Assurance:      {}", token.assurance_level);
            println!(
                "Claims:         {}",
                token.verified_claims.iter().cloned().collect::<Vec<_>>().join(", ")
            );
            println!("Expires:        {}", token.expires_at);
        }
        Commands::Credentials => {
            for c in wallet.credentials()? {
                println!("{}  {}  {}  {}", c.cred_id, c.status, c.issuer_did, c.received_at);
            }
        }
        Commands::Tokens => {
            for t in wallet.decision_tokens()? {
                println!("{}  {}  {}  expires {}", t.cred_id, t.verifier_url, t.assurance_level, t.expires_at);
            }
        }
        Commands::ExportBackup => {
            println!("{}", wallet.export_backup()?);
        }
        Commands::ImportBackup { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let info = wallet.import_backup(&json)?;
            println!("Imported {}", info.did);
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("clearing deletes the identity and all credentials; rerun with --yes");
            }
            wallet.clear()?;
            println!("Wallet cleared");
        }
    }

    Ok(())
}
