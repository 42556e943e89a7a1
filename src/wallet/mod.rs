// src/wallet/mod.rs
//! The holder's wallet: identity, recovery phrase, credentials and cached
//! verifier decisions behind one handle.

pub mod credential_storage;
pub mod key_management;
pub mod mnemonic;

use crate::error::{Result, WalletError};
use crate::models::credential::{StoredCredential, StoredDecisionToken};
use crate::models::did::{Did, DidDocument};
use crate::services::{IssuanceClient, VerificationClient};
use crate::wallet::credential_storage::{CredentialStore, StoredIdentity, StoredMnemonic, TokenCriteria};
use crate::wallet::key_management::{create_identity, derive_identity, Identity};
use crate::wallet::mnemonic::parse_mnemonic;
use crate::zkp::{PlaceholderProver, Predicate, PredicateProver};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const BACKUP_VERSION: u32 = 1;

/// Public facts about the wallet's identity.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub did: Did,
    pub address: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredIdentity> for WalletInfo {
    fn from(stored: &StoredIdentity) -> Self {
        Self {
            did: stored.did.clone(),
            address: stored.key_pair.address.clone(),
            public_key: stored.key_pair.public_key.clone(),
            created_at: stored.created_at,
        }
    }
}

/// Portable wallet export. Carries the private key in the clear.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBackup {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub wallet: BackupContents,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupContents {
    pub did: Did,
    pub private_key: String,
    pub public_key: String,
    pub address: String,
    #[serde(default)]
    pub mnemonic: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct Wallet {
    store: Arc<CredentialStore>,
    issuance: IssuanceClient,
    verification: VerificationClient,
}

impl Wallet {
    /// A wallet over `store` using the placeholder prover.
    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client) -> Self {
        Self::with_prover(store, http, Arc::new(PlaceholderProver::new()))
    }

    pub fn with_prover(
        store: Arc<CredentialStore>,
        http: reqwest::Client,
        prover: Arc<dyn PredicateProver>,
    ) -> Self {
        Self {
            issuance: IssuanceClient::new(http.clone(), store.clone()),
            verification: VerificationClient::new(http, store.clone(), prover),
            store,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.store.identity()?.is_some())
    }

    /// Creates a fresh identity and returns it with its recovery phrase.
    ///
    /// # Errors
    /// `WalletAlreadyInitialized` if an identity is already stored.
    pub fn create(&self) -> Result<(WalletInfo, String)> {
        let (identity, phrase) = create_identity()?;
        let stored = StoredIdentity {
            did: identity.did,
            key_pair: identity.key_pair,
            created_at: Utc::now(),
        };
        let info = WalletInfo::from(&stored);
        self.store.install_identity_if_absent(
            stored,
            Some(StoredMnemonic {
                phrase: phrase.clone(),
            }),
        )?;
        info!("created wallet {}", info.did);
        Ok((info, phrase))
    }

    /// Replaces the wallet contents with the identity behind `phrase`.
    pub fn restore_from_mnemonic(&self, phrase: &str) -> Result<WalletInfo> {
        let normalized = parse_mnemonic(phrase)?.to_string();
        let identity = key_management::restore_from_mnemonic(&normalized)?;
        let stored = StoredIdentity {
            did: identity.did,
            key_pair: identity.key_pair,
            created_at: Utc::now(),
        };
        let info = WalletInfo::from(&stored);
        self.store
            .replace_identity(stored, Some(StoredMnemonic { phrase: normalized }))?;
        info!("restored wallet {} from recovery phrase", info.did);
        Ok(info)
    }

    pub fn identity(&self) -> Result<Identity> {
        let stored = self
            .store
            .identity()?
            .ok_or(WalletError::WalletNotInitialized)?;
        Ok(Identity {
            did: stored.did,
            key_pair: stored.key_pair,
        })
    }

    pub fn info(&self) -> Result<WalletInfo> {
        self.store
            .identity()?
            .as_ref()
            .map(WalletInfo::from)
            .ok_or(WalletError::WalletNotInitialized)
    }

    pub fn did_document(&self) -> Result<DidDocument> {
        let did = self.info()?.did;
        let public_key = did.public_key_bytes()?;
        Ok(DidDocument::for_key(&did, &public_key))
    }

    /// The stored recovery phrase. Wallets imported from a backup without a
    /// phrase have none.
    pub fn export_mnemonic(&self) -> Result<Option<String>> {
        if !self.exists()? {
            return Err(WalletError::WalletNotInitialized);
        }
        Ok(self.store.mnemonic()?.map(|m| m.phrase.clone()))
    }

    /// Serializes the identity and recovery phrase as pretty JSON.
    pub fn export_backup(&self) -> Result<String> {
        let stored = self
            .store
            .identity()?
            .ok_or(WalletError::WalletNotInitialized)?;
        let backup = WalletBackup {
            version: BACKUP_VERSION,
            exported_at: Utc::now(),
            wallet: BackupContents {
                did: stored.did.clone(),
                private_key: stored.key_pair.private_key.clone(),
                public_key: stored.key_pair.public_key.clone(),
                address: stored.key_pair.address.clone(),
                mnemonic: self.store.mnemonic()?.map(|m| m.phrase.clone()),
                created_at: stored.created_at,
            },
        };
        Ok(serde_json::to_string_pretty(&backup)?)
    }

    /// Replaces the wallet contents with a backup produced by
    /// [`Wallet::export_backup`].
    ///
    /// # Errors
    /// `InvalidBackup` if the document is malformed, has an unknown version,
    /// or its DID (or phrase) does not belong to its private key.
    pub fn import_backup(&self, json: &str) -> Result<WalletInfo> {
        let backup: WalletBackup = serde_json::from_str(json)
            .map_err(|e| WalletError::InvalidBackup(format!("not a wallet backup: {e}")))?;
        if backup.version != BACKUP_VERSION {
            return Err(WalletError::InvalidBackup(format!(
                "unsupported backup version {}",
                backup.version
            )));
        }

        let contents = backup.wallet;
        let derived = derive_identity(&contents.private_key)
            .map_err(|e| WalletError::InvalidBackup(e.to_string()))?;
        if derived.did != contents.did {
            return Err(WalletError::InvalidBackup(
                "DID does not match the private key".into(),
            ));
        }

        let mnemonic = match contents.mnemonic.as_deref() {
            Some(phrase) => {
                let restored = key_management::restore_from_mnemonic(phrase)
                    .map_err(|e| WalletError::InvalidBackup(e.to_string()))?;
                if restored.did != derived.did {
                    return Err(WalletError::InvalidBackup(
                        "recovery phrase does not match the private key".into(),
                    ));
                }
                Some(StoredMnemonic {
                    phrase: phrase.to_string(),
                })
            }
            None => None,
        };

        let stored = StoredIdentity {
            did: derived.did,
            key_pair: derived.key_pair,
            created_at: contents.created_at,
        };
        let info = WalletInfo::from(&stored);
        self.store.replace_identity(stored, mnemonic)?;
        info!("imported wallet {} from backup", info.did);
        Ok(info)
    }

    /// Requests a credential for `claims` from the issuer at `issuer_url`.
    pub async fn issue(&self, issuer_url: &str, claims: Value) -> Result<StoredCredential> {
        let generation = self.store.generation()?;
        let holder = self.identity()?;
        self.issuance
            .issue_in_generation(generation, issuer_url, &holder, claims)
            .await
    }

    /// Proves `predicate` about a stored credential to a verifier.
    pub async fn verify(
        &self,
        cred_id: &str,
        verifier_url: &str,
        predicate: Predicate,
    ) -> Result<StoredDecisionToken> {
        self.verification.verify(cred_id, verifier_url, predicate).await
    }

    pub fn credentials(&self) -> Result<Vec<StoredCredential>> {
        self.store.credentials()
    }

    pub fn credential(&self, cred_id: &str) -> Result<StoredCredential> {
        self.store
            .credential(cred_id)?
            .ok_or_else(|| WalletError::CredentialNotFound(cred_id.to_string()))
    }

    pub fn decision_tokens(&self) -> Result<Vec<StoredDecisionToken>> {
        self.store.decision_tokens()
    }

    pub fn valid_token(&self, criteria: &TokenCriteria) -> Result<Option<StoredDecisionToken>> {
        self.store.get_valid(criteria)
    }

    /// Removes identity, phrase, credentials and tokens. Irreversible.
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        info!("wallet cleared");
        Ok(())
    }
}
