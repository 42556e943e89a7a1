// src/wallet/credential_storage.rs
//! Encrypted-at-rest credential store for the wallet component.
//!
//! Persists four logical collections (identity, mnemonic, credentials,
//! decision tokens), each as one encrypted JSON list under a fixed key.
//!
//! # Guarantees
//! - Credentials are unique by `credId`, tokens by `(credId, verifierUrl)`;
//!   a new record replaces the old one and lists stay newest-first
//! - Expired decision tokens are never returned and are purged on query
//! - Corrupted ciphertext surfaces as `StorageCorruption`, never as "empty"
//! - All reads and mutations pass through one lock per store instance
//! - `clear` and identity replacement start a new generation; protocol rounds
//!   that began in an older generation cannot write into the new one

use crate::error::{Result, WalletError};
use crate::models::credential::{StoredCredential, StoredDecisionToken};
use crate::models::did::Did;
use crate::storage::{Aes256GcmCipher, Cipher, InMemoryBackend, StorageBackend};
use crate::wallet::key_management::KeyPair;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Logical collections and their fixed storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Identity,
    Mnemonic,
    Credentials,
    DecisionTokens,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Identity,
        Collection::Mnemonic,
        Collection::Credentials,
        Collection::DecisionTokens,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Collection::Identity => "identity",
            Collection::Mnemonic => "mnemonic",
            Collection::Credentials => "credentials",
            Collection::DecisionTokens => "decision_tokens",
        }
    }

    /// Single-record collections hold at most one entry.
    fn is_singleton(self) -> bool {
        matches!(self, Collection::Identity | Collection::Mnemonic)
    }
}

/// A value that lives in exactly one collection and has a stable identity there.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn record_id(&self) -> String;
}

/// The wallet's identity record: DID, keys and creation time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    pub did: Did,
    #[serde(flatten)]
    pub key_pair: KeyPair,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct StoredMnemonic {
    pub phrase: String,
}

impl fmt::Debug for StoredMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoredMnemonic(<redacted>)")
    }
}

impl Record for StoredIdentity {
    const COLLECTION: Collection = Collection::Identity;

    fn record_id(&self) -> String {
        self.did.to_string()
    }
}

impl Record for StoredMnemonic {
    const COLLECTION: Collection = Collection::Mnemonic;

    fn record_id(&self) -> String {
        Collection::Mnemonic.key().to_string()
    }
}

impl Record for StoredCredential {
    const COLLECTION: Collection = Collection::Credentials;

    fn record_id(&self) -> String {
        self.cred_id.clone()
    }
}

impl Record for StoredDecisionToken {
    const COLLECTION: Collection = Collection::DecisionTokens;

    fn record_id(&self) -> String {
        format!("{}|{}", self.cred_id, self.verifier_url)
    }
}

/// Filters for [`CredentialStore::get_valid`]. Unset filters match anything.
#[derive(Debug, Clone, Default)]
pub struct TokenCriteria {
    pub cred_id: Option<String>,
    pub verifier_url: Option<String>,
    pub required_claims: Vec<String>,
}

impl TokenCriteria {
    fn matches(&self, token: &StoredDecisionToken) -> bool {
        self.cred_id.as_deref().map_or(true, |id| id == token.cred_id)
            && self
                .verifier_url
                .as_deref()
                .map_or(true, |url| url == token.verifier_url)
            && self
                .required_claims
                .iter()
                .all(|claim| token.verified_claims.contains(claim))
    }
}

/// Encrypted, lock-serialized record store for one wallet instance.
pub struct CredentialStore {
    backend: Arc<dyn StorageBackend>,
    cipher: Box<dyn Cipher>,
    /// Guards every access; holds the current generation.
    lock: Mutex<u64>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn StorageBackend>, cipher: Box<dyn Cipher>) -> Self {
        Self {
            backend,
            cipher,
            lock: Mutex::new(0),
        }
    }

    /// A throwaway store: in-memory backend, random AES key.
    pub fn in_memory() -> Result<Self> {
        let key = Aes256GcmCipher::generate_key()?;
        Ok(Self::new(
            Arc::new(InMemoryBackend::new()),
            Box::new(Aes256GcmCipher::new(*key)),
        ))
    }

    fn guard(&self) -> Result<MutexGuard<'_, u64>> {
        self.lock
            .lock()
            .map_err(|e| WalletError::Storage(format!("store lock poisoned: {e}")))
    }

    fn load<R: Record>(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION.key();
        let Some(blob) = self.backend.read(collection)? else {
            return Ok(Vec::new());
        };
        let plaintext = self
            .cipher
            .open(&blob)
            .map_err(|reason| WalletError::corruption(collection, reason))?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            WalletError::corruption(collection, format!("decrypted data is not a record list: {e}"))
        })
    }

    fn encode<R: Record>(&self, records: &[R]) -> Result<Vec<u8>> {
        let plaintext = serde_json::to_vec(records)?;
        self.cipher.seal(&plaintext)
    }

    fn save<R: Record>(&self, records: &[R]) -> Result<()> {
        let blob = self.encode(records)?;
        self.backend.write(R::COLLECTION.key(), blob)
    }

    /// Inserts `record` at the front of its collection, replacing any record
    /// with the same id. Single-record collections are overwritten.
    pub fn put<R: Record>(&self, record: R) -> Result<()> {
        let _guard = self.guard()?;
        self.put_locked(record)
    }

    /// Current generation; changes on every `clear` and identity replacement.
    pub fn generation(&self) -> Result<u64> {
        Ok(*self.guard()?)
    }

    /// [`CredentialStore::put`], but only while the store is still in
    /// `generation`.
    ///
    /// # Errors
    /// `WalletChanged` if the wallet was cleared or replaced since then.
    pub fn put_in_generation<R: Record>(&self, record: R, generation: u64) -> Result<()> {
        let guard = self.guard()?;
        if *guard != generation {
            return Err(WalletError::WalletChanged);
        }
        self.put_locked(record)
    }

    fn put_locked<R: Record>(&self, record: R) -> Result<()> {
        let records = if R::COLLECTION.is_singleton() {
            vec![record]
        } else {
            let id = record.record_id();
            let mut records: Vec<R> = self.load()?;
            records.retain(|r| r.record_id() != id);
            records.insert(0, record);
            records
        };
        self.save(&records)?;
        debug!("stored record in '{}' ({} total)", R::COLLECTION.key(), records.len());
        Ok(())
    }

    pub fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let _guard = self.guard()?;
        self.load()
    }

    pub fn get_by_id<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let _guard = self.guard()?;
        Ok(self.load::<R>()?.into_iter().find(|r| r.record_id() == id))
    }

    pub fn identity(&self) -> Result<Option<StoredIdentity>> {
        Ok(self.get_all::<StoredIdentity>()?.into_iter().next())
    }

    pub fn mnemonic(&self) -> Result<Option<StoredMnemonic>> {
        Ok(self.get_all::<StoredMnemonic>()?.into_iter().next())
    }

    pub fn credentials(&self) -> Result<Vec<StoredCredential>> {
        self.get_all()
    }

    pub fn credential(&self, cred_id: &str) -> Result<Option<StoredCredential>> {
        self.get_by_id(cred_id)
    }

    pub fn decision_tokens(&self) -> Result<Vec<StoredDecisionToken>> {
        self.get_all()
    }

    /// Returns the most recently received unexpired token matching `criteria`.
    pub fn get_valid(&self, criteria: &TokenCriteria) -> Result<Option<StoredDecisionToken>> {
        self.get_valid_at(criteria, Utc::now())
    }

    /// [`CredentialStore::get_valid`] against an explicit clock reading.
    ///
    /// Tokens with `expires_at <= now` are removed from the store first.
    pub fn get_valid_at(
        &self,
        criteria: &TokenCriteria,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredDecisionToken>> {
        let _guard = self.guard()?;
        let tokens: Vec<StoredDecisionToken> = self.load()?;
        let before = tokens.len();
        let live: Vec<StoredDecisionToken> =
            tokens.into_iter().filter(|t| !t.is_expired(now)).collect();

        if live.len() != before {
            self.save(&live)?;
            debug!("purged {} expired decision token(s)", before - live.len());
        }

        Ok(live
            .into_iter()
            .filter(|t| criteria.matches(t))
            .fold(None, |best: Option<StoredDecisionToken>, t| match best {
                Some(b) if b.received_at >= t.received_at => Some(b),
                _ => Some(t),
            }))
    }

    /// Atomically wipes every collection and installs a new identity.
    pub fn replace_identity(
        &self,
        identity: StoredIdentity,
        mnemonic: Option<StoredMnemonic>,
    ) -> Result<()> {
        let mut guard = self.guard()?;
        self.install_locked(identity, mnemonic)?;
        *guard = guard.wrapping_add(1);
        Ok(())
    }

    /// [`CredentialStore::replace_identity`] for an empty wallet. The check
    /// and the write happen under one lock.
    ///
    /// # Errors
    /// `WalletAlreadyInitialized` if an identity is already stored.
    pub fn install_identity_if_absent(
        &self,
        identity: StoredIdentity,
        mnemonic: Option<StoredMnemonic>,
    ) -> Result<()> {
        let mut guard = self.guard()?;
        if !self.load::<StoredIdentity>()?.is_empty() {
            return Err(WalletError::WalletAlreadyInitialized);
        }
        self.install_locked(identity, mnemonic)?;
        *guard = guard.wrapping_add(1);
        Ok(())
    }

    fn install_locked(
        &self,
        identity: StoredIdentity,
        mnemonic: Option<StoredMnemonic>,
    ) -> Result<()> {
        let identity_blob = self.encode(&[identity])?;
        let mnemonic_blob = match mnemonic {
            Some(m) => Some(self.encode(&[m])?),
            None => None,
        };
        self.backend.write_batch(&[
            (Collection::Identity.key(), Some(identity_blob)),
            (Collection::Mnemonic.key(), mnemonic_blob),
            (Collection::Credentials.key(), None),
            (Collection::DecisionTokens.key(), None),
        ])
    }

    /// Irreversibly removes all collections. Either everything is cleared or
    /// the error is returned and prior state is left intact.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.guard()?;
        let changes: Vec<_> = Collection::ALL.iter().map(|c| (c.key(), None)).collect();
        self.backend.write_batch(&changes)?;
        *guard = guard.wrapping_add(1);
        debug!("cleared all wallet collections");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::Change;
    use chrono::Duration;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Wraps an in-memory backend and can be told to reject every write.
    #[derive(Default)]
    struct FlakyBackend {
        inner: InMemoryBackend,
        fail_writes: AtomicBool,
    }

    impl StorageBackend for FlakyBackend {
        fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read(key)
        }

        fn write_batch(&self, changes: &[Change<'_>]) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(WalletError::Storage("disk full".into()));
            }
            self.inner.write_batch(changes)
        }
    }

    fn new_identity() -> (StoredIdentity, StoredMnemonic) {
        let (identity, phrase) = crate::wallet::key_management::create_identity().unwrap();
        (
            StoredIdentity {
                did: identity.did,
                key_pair: identity.key_pair,
                created_at: Utc::now(),
            },
            StoredMnemonic { phrase },
        )
    }

    fn store_with_backend() -> (CredentialStore, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = CredentialStore::new(
            backend.clone(),
            Box::new(Aes256GcmCipher::new([7u8; 32])),
        );
        (store, backend)
    }

    fn credential(id: &str, status: &str) -> StoredCredential {
        StoredCredential {
            cred_id: id.to_string(),
            issuer_did: "did:key:zIssuer".to_string(),
            status: status.to_string(),
            credential_jwt: "h.p.s".to_string(),
            commitment_hash: "0x01".to_string(),
            commitment_jwt: "h.c.s".to_string(),
            holder_did: "did:key:zHolder".to_string(),
            received_at: Utc::now(),
        }
    }

    fn token(cred: &str, verifier: &str, claims: &[&str], expires_at: DateTime<Utc>, received_at: DateTime<Utc>) -> StoredDecisionToken {
        StoredDecisionToken {
            cred_id: cred.to_string(),
            verifier_url: verifier.to_string(),
            decision_token: format!("tok-{cred}-{}", received_at.timestamp()),
            assurance_level: "HIGH".to_string(),
            verified_claims: claims.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
            expires_at,
            received_at,
        }
    }

    #[test]
    fn test_empty_collections_are_empty_lists() {
        let (store, _) = store_with_backend();
        assert!(store.credentials().unwrap().is_empty());
        assert!(store.decision_tokens().unwrap().is_empty());
        assert!(store.identity().unwrap().is_none());
    }

    #[test]
    fn test_saved_empty_list_reads_back_empty() {
        let (store, _) = store_with_backend();
        store.save::<StoredCredential>(&[]).unwrap();
        assert!(store.credentials().unwrap().is_empty());
    }

    #[test]
    fn test_credential_dedup_newest_first() {
        let (store, _) = store_with_backend();
        store.put(credential("a", "ISSUED")).unwrap();
        store.put(credential("b", "ISSUED")).unwrap();
        store.put(credential("c", "ISSUED")).unwrap();
        store.put(credential("a", "REISSUED")).unwrap();

        let ids: Vec<String> = store.credentials().unwrap().into_iter().map(|c| c.cred_id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(store.credential("a").unwrap().unwrap().status, "REISSUED");
        assert!(store.credential("zzz").unwrap().is_none());
    }

    #[test]
    fn test_blob_is_encrypted() {
        let (store, backend) = store_with_backend();
        store.put(credential("secret-cred", "ISSUED")).unwrap();
        let raw = backend.read("credentials").unwrap().unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(!text.contains("secret-cred"));
    }

    #[test]
    fn test_corrupted_ciphertext_is_an_error() {
        let (store, backend) = store_with_backend();
        store.put(credential("a", "ISSUED")).unwrap();
        let mut raw = backend.read("credentials").unwrap().unwrap();
        raw[20] ^= 0xff;
        backend.insert_raw("credentials", raw).unwrap();

        assert!(matches!(
            store.credentials(),
            Err(WalletError::StorageCorruption { .. })
        ));
    }

    #[test]
    fn test_non_list_plaintext_is_corruption() {
        let (store, backend) = store_with_backend();
        let blob = Aes256GcmCipher::new([7u8; 32]).seal(br#"{"not":"a list"}"#).unwrap();
        backend.insert_raw("credentials", blob).unwrap();
        assert!(matches!(
            store.credentials(),
            Err(WalletError::StorageCorruption { .. })
        ));

        let garbage = Aes256GcmCipher::new([7u8; 32]).seal(b"not json").unwrap();
        backend.insert_raw("decision_tokens", garbage).unwrap();
        assert!(matches!(
            store.decision_tokens(),
            Err(WalletError::StorageCorruption { .. })
        ));
    }

    #[test]
    fn test_wrong_key_is_corruption() {
        let (store, backend) = store_with_backend();
        store.put(credential("a", "ISSUED")).unwrap();
        let other = CredentialStore::new(backend, Box::new(Aes256GcmCipher::new([8u8; 32])));
        assert!(matches!(
            other.credentials(),
            Err(WalletError::StorageCorruption { .. })
        ));
    }

    #[test]
    fn test_expired_token_never_returned_and_purged() {
        let (store, _) = store_with_backend();
        let now = Utc::now();
        store
            .put(token("c1", "http://v", &["over_18"], now - Duration::seconds(1), now - Duration::seconds(60)))
            .unwrap();

        let criteria = TokenCriteria {
            cred_id: Some("c1".into()),
            ..Default::default()
        };
        assert!(store.get_valid_at(&criteria, now).unwrap().is_none());
        assert!(store.decision_tokens().unwrap().is_empty());
    }

    #[test]
    fn test_token_expiring_exactly_now_is_invalid() {
        let (store, _) = store_with_backend();
        let now = Utc::now();
        store.put(token("c1", "http://v", &[], now, now - Duration::seconds(5))).unwrap();
        assert!(store.get_valid_at(&TokenCriteria::default(), now).unwrap().is_none());
    }

    #[test]
    fn test_required_claims_must_be_subset() {
        let (store, _) = store_with_backend();
        let now = Utc::now();
        store
            .put(token("c1", "http://v", &["over_18"], now + Duration::minutes(5), now))
            .unwrap();

        let ok = TokenCriteria {
            cred_id: Some("c1".into()),
            verifier_url: Some("http://v".into()),
            required_claims: vec!["over_18".into()],
        };
        assert!(store.get_valid_at(&ok, now).unwrap().is_some());

        let too_much = TokenCriteria {
            required_claims: vec!["over_18".into(), "resident".into()],
            ..ok.clone()
        };
        assert!(store.get_valid_at(&too_much, now).unwrap().is_none());

        let other_verifier = TokenCriteria {
            verifier_url: Some("http://elsewhere".into()),
            ..ok
        };
        assert!(store.get_valid_at(&other_verifier, now).unwrap().is_none());
    }

    #[test]
    fn test_most_recent_match_wins() {
        let (store, _) = store_with_backend();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        store.put(token("c1", "http://a", &["over_18"], later, now - Duration::seconds(30))).unwrap();
        store.put(token("c1", "http://b", &["over_18"], later, now - Duration::seconds(10))).unwrap();
        store.put(token("c1", "http://c", &["over_18"], later, now - Duration::seconds(20))).unwrap();

        let criteria = TokenCriteria {
            cred_id: Some("c1".into()),
            ..Default::default()
        };
        let best = store.get_valid_at(&criteria, now).unwrap().unwrap();
        assert_eq!(best.verifier_url, "http://b");
    }

    #[test]
    fn test_token_replaced_per_cred_and_verifier() {
        let (store, _) = store_with_backend();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        store.put(token("c1", "http://v", &["over_18"], later, now - Duration::seconds(30))).unwrap();
        store.put(token("c1", "http://v", &["over_18"], later, now)).unwrap();
        store.put(token("c2", "http://v", &["over_18"], later, now)).unwrap();
        assert_eq!(store.decision_tokens().unwrap().len(), 2);
    }

    #[test]
    fn test_identity_is_single_record() {
        let (store, _) = store_with_backend();
        let first = crate::wallet::key_management::create_identity().unwrap().0;
        let second = crate::wallet::key_management::create_identity().unwrap().0;
        for identity in [&first, &second] {
            store
                .put(StoredIdentity {
                    did: identity.did.clone(),
                    key_pair: identity.key_pair.clone(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        let all = store.get_all::<StoredIdentity>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].did, second.did);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, backend) = store_with_backend();
        let (identity, phrase) = crate::wallet::key_management::create_identity().unwrap();
        store
            .put(StoredIdentity {
                did: identity.did.clone(),
                key_pair: identity.key_pair.clone(),
                created_at: Utc::now(),
            })
            .unwrap();
        store.put(StoredMnemonic { phrase }).unwrap();
        store.put(credential("a", "ISSUED")).unwrap();
        let now = Utc::now();
        store.put(token("a", "http://v", &[], now + Duration::hours(1), now)).unwrap();

        store.clear().unwrap();

        assert!(backend.keys().is_empty());
        assert!(store.identity().unwrap().is_none());
        assert!(store.mnemonic().unwrap().is_none());
        assert!(store.credentials().unwrap().is_empty());
        assert!(store.decision_tokens().unwrap().is_empty());
    }

    #[test]
    fn test_replace_identity_wipes_previous_wallet() {
        let (store, _) = store_with_backend();
        store.put(credential("a", "ISSUED")).unwrap();
        let (identity, _) = crate::wallet::key_management::create_identity().unwrap();
        store
            .replace_identity(
                StoredIdentity {
                    did: identity.did.clone(),
                    key_pair: identity.key_pair.clone(),
                    created_at: Utc::now(),
                },
                None,
            )
            .unwrap();
        assert_eq!(store.identity().unwrap().unwrap().did, identity.did);
        assert!(store.mnemonic().unwrap().is_none());
        assert!(store.credentials().unwrap().is_empty());
    }

    #[test]
    fn test_identity_record_flattens_key_pair() {
        let (identity, _) = crate::wallet::key_management::create_identity().unwrap();
        let stored = StoredIdentity {
            did: identity.did.clone(),
            key_pair: identity.key_pair.clone(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        for field in ["did", "privateKey", "publicKey", "address", "createdAt"] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_concurrent_puts_keep_every_record() {
        let (store, _) = store_with_backend();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.put(credential(&format!("c{i}"), "ISSUED")).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.credentials().unwrap().len(), 8);
    }

    #[test]
    fn test_failed_writes_leave_state_intact() {
        let backend = Arc::new(FlakyBackend::default());
        let store = CredentialStore::new(backend.clone(), Box::new(Aes256GcmCipher::new([9u8; 32])));
        let (identity, mnemonic) = new_identity();
        store.replace_identity(identity.clone(), Some(mnemonic)).unwrap();
        store.put(credential("a", "ISSUED")).unwrap();
        let now = Utc::now();
        store.put(token("a", "http://v", &["over_18"], now + Duration::hours(1), now)).unwrap();
        let generation = store.generation().unwrap();

        backend.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(store.clear(), Err(WalletError::Storage(_))));
        assert!(matches!(store.put(credential("b", "ISSUED")), Err(WalletError::Storage(_))));
        let (other, other_mnemonic) = new_identity();
        assert!(matches!(
            store.replace_identity(other, Some(other_mnemonic)),
            Err(WalletError::Storage(_))
        ));

        assert_eq!(store.identity().unwrap().unwrap().did, identity.did);
        assert!(store.mnemonic().unwrap().is_some());
        let ids: Vec<String> = store.credentials().unwrap().into_iter().map(|c| c.cred_id).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(store.decision_tokens().unwrap().len(), 1);
        assert_eq!(store.generation().unwrap(), generation);
    }

    #[test]
    fn test_write_from_older_generation_is_refused() {
        let (store, _) = store_with_backend();
        let (identity, mnemonic) = new_identity();
        store.replace_identity(identity, Some(mnemonic)).unwrap();

        let started = store.generation().unwrap();
        store.put_in_generation(credential("a", "ISSUED"), started).unwrap();

        store.clear().unwrap();
        assert!(matches!(
            store.put_in_generation(credential("b", "ISSUED"), started),
            Err(WalletError::WalletChanged)
        ));
        assert!(store.credentials().unwrap().is_empty());
        assert!(store.identity().unwrap().is_none());
    }

    #[test]
    fn test_install_identity_only_when_absent() {
        let (store, _) = store_with_backend();
        let (first, first_mnemonic) = new_identity();
        store
            .install_identity_if_absent(first.clone(), Some(first_mnemonic))
            .unwrap();

        let (second, second_mnemonic) = new_identity();
        assert!(matches!(
            store.install_identity_if_absent(second, Some(second_mnemonic)),
            Err(WalletError::WalletAlreadyInitialized)
        ));
        assert_eq!(store.identity().unwrap().unwrap().did, first.did);
    }

    #[test]
    fn test_concurrent_installs_keep_one_identity() {
        let (store, _) = store_with_backend();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let (identity, mnemonic) = new_identity();
                    let did = identity.did.clone();
                    store
                        .install_identity_if_absent(identity, Some(mnemonic))
                        .ok()
                        .map(|_| did)
                })
            })
            .collect();
        let winners: Vec<Did> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(store.identity().unwrap().unwrap().did, winners[0]);
    }
}
