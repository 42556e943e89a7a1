// src/lib.rs

//! # DID Wallet Core
//!
//! Holder-side building blocks of a self-sovereign identity wallet.
//!
//! ## Layout
//! 1. **Wallet Layer**: keys, `did:key` identifiers, recovery phrases and the
//!    encrypted credential store
//! 2. **Services Layer**: issuance and verification protocol clients
//! 3. **ZKP Layer**: predicate evaluation and proof artifacts
//! 4. **Storage Layer**: pluggable backends and at-rest encryption

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
pub mod wallet;
pub mod zkp;

pub use config::WalletConfig;
pub use error::{Result, WalletError};
pub use models::credential::{StoredCredential, StoredDecisionToken};
pub use models::did::{Did, DidDocument};
pub use wallet::credential_storage::{CredentialStore, TokenCriteria};
pub use wallet::key_management::{Identity, KeyPair};
pub use wallet::{Wallet, WalletInfo};
pub use zkp::Predicate;
