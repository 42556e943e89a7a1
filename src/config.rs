// src/config.rs
//! Wallet configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. An optional TOML file (`wallet.toml` unless a path is given)
//! 3. `WALLET_*` environment variables (a `.env` file is loaded first)

use crate::error::{Result, WalletError};
use crate::storage::{Aes256GcmCipher, FileBackend};
use crate::wallet::credential_storage::CredentialStore;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "wallet.toml";
pub const DEFAULT_STORE_PATH: &str = "wallet-store.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize, Clone)]
pub struct WalletConfig {
    pub store_path: PathBuf,
    /// 64 hex chars (a 32-byte AES-256 key).
    pub encryption_key: Option<String>,
    pub issuer_url: Option<String>,
    pub verifier_url: Option<String>,
    pub http_timeout_secs: u64,
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("store_path", &self.store_path)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .field("issuer_url", &self.issuer_url)
            .field("verifier_url", &self.verifier_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl WalletConfig {
    /// Loads `.env`, then the layered configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_sources(file, true)
    }

    /// Builds the configuration without touching `.env`. Environment
    /// variables are only read when `with_env` is set.
    pub fn from_sources(file: Option<&Path>, with_env: bool) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = Config::builder()
            .set_default("store_path", DEFAULT_STORE_PATH)?
            .set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64)?
            .add_source(file_source);
        if with_env {
            builder = builder.add_source(Environment::with_prefix("WALLET"));
        }

        let config: WalletConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// The at-rest cipher for the configured key.
    ///
    /// # Errors
    /// `Config` if the key is missing or is not 32 hex-encoded bytes.
    pub fn cipher(&self) -> Result<Aes256GcmCipher> {
        let key = self
            .encryption_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| WalletError::Config("WALLET_ENCRYPTION_KEY is not set".into()))?;
        Aes256GcmCipher::from_hex(key)
    }

    /// Opens the encrypted store at `store_path`.
    pub fn open_store(&self) -> Result<CredentialStore> {
        let cipher = self.cipher()?;
        let backend = FileBackend::open(&self.store_path)?;
        Ok(CredentialStore::new(Arc::new(backend), Box::new(cipher)))
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .build()
            .map_err(|e| WalletError::Config(format!("cannot build HTTP client: {e}")))
    }
}
