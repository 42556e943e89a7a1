// src/error.rs
//! Error taxonomy for the wallet core.
//!
//! Every variant is terminal for the operation that raised it; nothing inside
//! the core retries. Network variants keep the endpoint and the underlying
//! cause so callers can decide on their own retry policy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    /// The OS entropy source could not be read.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The recovery phrase failed BIP-39 wordlist or checksum validation.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// A private key, public key or DID could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("issuer unreachable at {endpoint}: {source}")]
    IssuerUnreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("issuer metadata at {endpoint} is invalid: {reason}")]
    IssuerMetadataInvalid { endpoint: String, reason: String },

    #[error("issuance rejected by {endpoint}: {reason}")]
    IssuanceRejected { endpoint: String, reason: String },

    #[error("claim missing from credential: {0}")]
    ClaimMissing(String),

    #[error("unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    #[error("verification failed at {endpoint}: {reason}")]
    VerificationFailed { endpoint: String, reason: String },

    #[error("wallet has no identity; create or restore one first")]
    WalletNotInitialized,

    #[error("wallet already holds an identity; clear it before creating a new one")]
    WalletAlreadyInitialized,

    /// The wallet was cleared or replaced while a protocol round was running.
    #[error("wallet was cleared or replaced while the operation was in flight")]
    WalletChanged,

    #[error("credential not found: {0}")]
    CredentialNotFound(String),

    #[error("invalid wallet backup: {0}")]
    InvalidBackup(String),

    /// Ciphertext could not be opened, or the plaintext is not a record list.
    #[error("storage corruption in '{collection}': {reason}")]
    StorageCorruption { collection: String, reason: String },

    /// Backend I/O failure, unrelated to the content of the data.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl WalletError {
    pub(crate) fn corruption(collection: &str, reason: impl Into<String>) -> Self {
        WalletError::StorageCorruption {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for WalletError {
    fn from(e: config::ConfigError) -> Self {
        WalletError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
