// src/wallet/key_management.rs
//! Cryptographic key management for the DID wallet.
//!
//! Provides generation, derivation and usage of the holder's key for:
//! - `did:key` identifiers
//! - Payload signing (issuance proof of control, generic messages)
//! - Signature verification against a key, address or DID
//!
//! Uses the following cryptographic primitives:
//! - Ed25519 signatures (via `ed25519-dalek`)
//! - Keccak-256 for address derivation
//! - BIP-39 / SLIP-0010 for recovery phrases
//!
//! Signatures are self-describing: `hex(public_key || signature)`. This lets a
//! verifier recover the signer's identity from the signature alone and compare
//! it against whatever identifier it expects.

use crate::error::{Result, WalletError};
use crate::models::did::Did;
use crate::utils::crypto::{address_from_public_key, normalize_address};
use crate::wallet::mnemonic::{derive_secret_key, generate_mnemonic, parse_mnemonic};
use bip39::Mnemonic;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The holder's key material in its stored, hex-encoded form.
///
/// Never transmitted; only used locally to sign.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish()
    }
}

/// A DID together with the key pair it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub did: Did,
    pub key_pair: KeyPair,
}

/// Holds the live signing key for one wallet identity.
pub struct KeyManager {
    signing_key: SigningKey,
}

impl KeyManager {
    /// Builds a key manager from a hex-encoded 32-byte private key
    /// (an optional `0x` prefix is accepted).
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(hex_part)
                .map_err(|e| WalletError::InvalidKey(format!("private key is not hex: {e}")))?,
        );
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            WalletError::InvalidKey(format!("private key must be 32 bytes, got {}", bytes.len()))
        })?;
        let secret = Zeroizing::new(secret);
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// Derives the key manager for a parsed recovery phrase.
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Result<Self> {
        let secret = derive_secret_key(mnemonic)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn did(&self) -> Did {
        Did::from_public_key(&self.public_key_bytes())
    }

    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key_bytes())
    }

    pub fn identity(&self) -> Identity {
        let public_key = self.public_key_bytes();
        Identity {
            did: Did::from_public_key(&public_key),
            key_pair: KeyPair {
                private_key: hex::encode(self.signing_key.to_bytes()),
                public_key: hex::encode(public_key),
                address: address_from_public_key(&public_key),
            },
        }
    }

    /// Signs the exact bytes given and returns `hex(public_key || signature)`.
    pub fn sign_message(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        let mut out = Vec::with_capacity(PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH);
        out.extend_from_slice(&self.public_key_bytes());
        out.extend_from_slice(&signature.to_bytes());
        hex::encode(out)
    }
}

/// Generates a fresh identity and the recovery phrase that restores it.
///
/// # Errors
/// `KeyGeneration` if the entropy source is unavailable.
pub fn create_identity() -> Result<(Identity, String)> {
    let mnemonic = generate_mnemonic()?;
    let manager = KeyManager::from_mnemonic(&mnemonic)?;
    Ok((manager.identity(), mnemonic.to_string()))
}

/// Recomputes the identity for an existing private key. Deterministic.
pub fn derive_identity(private_key: &str) -> Result<Identity> {
    Ok(KeyManager::from_private_key(private_key)?.identity())
}

/// Restores the identity encoded by a BIP-39 phrase.
///
/// # Errors
/// `InvalidMnemonic` if the phrase fails wordlist or checksum validation.
pub fn restore_from_mnemonic(phrase: &str) -> Result<Identity> {
    let mnemonic = parse_mnemonic(phrase)?;
    Ok(KeyManager::from_mnemonic(&mnemonic)?.identity())
}

/// Signs `payload` with a hex-encoded private key.
pub fn sign(private_key: &str, payload: impl AsRef<[u8]>) -> Result<String> {
    Ok(KeyManager::from_private_key(private_key)?.sign_message(payload.as_ref()))
}

/// Recovers the signing key from a self-describing signature, provided the
/// signature is valid for `payload`.
pub fn recover_signer(payload: &[u8], signature: &str) -> Option<VerifyingKey> {
    let hex_part = signature.trim().strip_prefix("0x").unwrap_or(signature.trim());
    let bytes = hex::decode(hex_part).ok()?;
    if bytes.len() != PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH {
        return None;
    }

    let public_key: [u8; PUBLIC_KEY_LENGTH] = bytes[..PUBLIC_KEY_LENGTH].try_into().ok()?;
    let sig_bytes: [u8; SIGNATURE_LENGTH] = bytes[PUBLIC_KEY_LENGTH..].try_into().ok()?;
    let verifying_key = VerifyingKey::from_bytes(&public_key).ok()?;
    verifying_key
        .verify_strict(payload, &Signature::from_bytes(&sig_bytes))
        .ok()?;
    Some(verifying_key)
}

/// Checks that `signature` over `payload` was produced by `expected`.
///
/// `expected` may be a hex public key, a `0x` address or a `did:key`. Any
/// mismatch or malformed input yields `false`, never an error.
pub fn verify(expected: &str, payload: impl AsRef<[u8]>, signature: &str) -> bool {
    let Some(signer) = recover_signer(payload.as_ref(), signature) else {
        return false;
    };
    let signer_key = signer.to_bytes();
    let expected = expected.trim();

    if expected.starts_with("did:") {
        return Did::parse(expected)
            .and_then(|did| did.public_key_bytes())
            .map(|key| key == signer_key)
            .unwrap_or(false);
    }

    let normalized = normalize_address(expected);
    match normalized.len() {
        40 => normalized == normalize_address(&address_from_public_key(&signer_key)),
        64 => normalized == hex::encode(signer_key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str =
        "legal winner thank year wave sausage worth useful legal winner thank yellow";

    #[test]
    fn test_create_then_derive_same_did() {
        let (identity, _) = create_identity().unwrap();
        let derived = derive_identity(&identity.key_pair.private_key).unwrap();
        assert_eq!(derived.did, identity.did);
        assert_eq!(derived.key_pair, identity.key_pair);
    }

    #[test]
    fn test_mnemonic_restores_created_identity() {
        let (identity, phrase) = create_identity().unwrap();
        let restored = restore_from_mnemonic(&phrase).unwrap();
        assert_eq!(restored.did, identity.did);
    }

    #[test]
    fn test_restore_is_deterministic() {
        let a = restore_from_mnemonic(PHRASE).unwrap();
        let b = restore_from_mnemonic(PHRASE).unwrap();
        assert_eq!(a.did, b.did);
        assert_eq!(a.key_pair.address, b.key_pair.address);
    }

    #[test]
    fn test_restore_known_did() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        assert_eq!(
            identity.did.as_str(),
            "did:key:z6MkwU7gxS3sAgc3q1u5KtEBBJsh9XYPPUPpm3uhv2EPvY4a"
        );
        assert_eq!(
            identity.key_pair.public_key,
            "fccecf873159a61896286f12a3e5f3e9a48cde5489d894224d33367cd6dcf5b3"
        );
    }

    #[test]
    fn test_invalid_mnemonic() {
        let result = restore_from_mnemonic("not a real recovery phrase at all");
        assert!(matches!(result, Err(WalletError::InvalidMnemonic(_))));
    }

    #[test]
    fn test_did_matches_public_key() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let key = identity.did.public_key_bytes().unwrap();
        assert_eq!(hex::encode(key), identity.key_pair.public_key);
    }

    #[test]
    fn test_sign_verify_every_identifier_form() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let kp = &identity.key_pair;
        let sig = sign(&kp.private_key, "hello").unwrap();

        assert!(verify(&kp.public_key, "hello", &sig));
        assert!(verify(&kp.address, "hello", &sig));
        assert!(verify(&kp.address.to_uppercase().replace("0X", "0x"), "hello", &sig));
        assert!(verify(identity.did.as_str(), "hello", &sig));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let sig = sign(&identity.key_pair.private_key, r#"{"a":1}"#).unwrap();
        assert!(!verify(&identity.key_pair.public_key, r#"{"a":2}"#, &sig));
    }

    #[test]
    fn test_other_key_signature_fails() {
        let ours = restore_from_mnemonic(PHRASE).unwrap();
        let (theirs, _) = create_identity().unwrap();
        let sig = sign(&theirs.key_pair.private_key, "payload").unwrap();
        assert!(!verify(&ours.key_pair.public_key, "payload", &sig));
        assert!(!verify(ours.did.as_str(), "payload", &sig));
        assert!(!verify(&ours.key_pair.address, "payload", &sig));
    }

    #[test]
    fn test_malformed_signature_is_false_not_error() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let pk = &identity.key_pair.public_key;
        assert!(!verify(pk, "payload", ""));
        assert!(!verify(pk, "payload", "zz-not-hex"));
        assert!(!verify(pk, "payload", "0xdeadbeef"));
        assert!(!verify(pk, "payload", &"00".repeat(96)));
        assert!(!verify("garbage", "payload", &sign(&identity.key_pair.private_key, "payload").unwrap()));
    }

    #[test]
    fn test_swapped_embedded_key_fails() {
        let ours = restore_from_mnemonic(PHRASE).unwrap();
        let (theirs, _) = create_identity().unwrap();
        let sig = sign(&theirs.key_pair.private_key, "payload").unwrap();
        // Splice our public key in front of their signature bytes.
        let forged = format!("{}{}", ours.key_pair.public_key, &sig[64..]);
        assert!(!verify(&ours.key_pair.public_key, "payload", &forged));
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(derive_identity("xyz"), Err(WalletError::InvalidKey(_))));
        assert!(matches!(derive_identity("abcd"), Err(WalletError::InvalidKey(_))));
    }

    #[test]
    fn test_private_key_accepts_0x_prefix() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let prefixed = format!("0x{}", identity.key_pair.private_key);
        assert_eq!(derive_identity(&prefixed).unwrap().did, identity.did);
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let identity = restore_from_mnemonic(PHRASE).unwrap();
        let printed = format!("{:?}", identity.key_pair);
        assert!(!printed.contains(&identity.key_pair.private_key));
        assert!(printed.contains("<redacted>"));
    }
}
