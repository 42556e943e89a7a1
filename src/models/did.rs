// src/models/did.rs
//! Decentralized Identifier (DID) data model.
//!
//! Implements the `did:key` method for Ed25519 public keys:
//!
//! ```text
//! did:key:z<base58btc(0xed 0x01 || 32-byte public key)>
//! ```
//!
//! The `z` is the multibase prefix for base58btc and `0xed 0x01` is the
//! varint-encoded multicodec for an Ed25519 public key.

use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::fmt;

const DID_KEY_PREFIX: &str = "did:key:";
const MULTIBASE_BASE58BTC: char = 'z';
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];
const PUBLIC_KEY_LEN: usize = 32;

/// A `did:key` identifier derived from an Ed25519 public key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Derives the DID for a 32-byte Ed25519 public key.
    ///
    /// Pure function of the key bytes: identical input always yields the
    /// same DID, and distinct keys yield distinct DIDs.
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> Self {
        let mut bytes = Vec::with_capacity(ED25519_MULTICODEC.len() + PUBLIC_KEY_LEN);
        bytes.extend_from_slice(&ED25519_MULTICODEC);
        bytes.extend_from_slice(public_key);
        let encoded = bs58::encode(bytes)
            .with_alphabet(bs58::Alphabet::BITCOIN)
            .into_string();
        Did(format!("{DID_KEY_PREFIX}{MULTIBASE_BASE58BTC}{encoded}"))
    }

    /// Parses and validates a `did:key` string.
    pub fn parse(did: &str) -> Result<Self> {
        let parsed = Did(did.to_string());
        parsed.public_key_bytes()?;
        Ok(parsed)
    }

    /// Decodes the Ed25519 public key embedded in the identifier.
    pub fn public_key_bytes(&self) -> Result<[u8; PUBLIC_KEY_LEN]> {
        let multibase = self
            .0
            .strip_prefix(DID_KEY_PREFIX)
            .ok_or_else(|| WalletError::InvalidKey(format!("not a did:key identifier: {}", self.0)))?;
        let encoded = multibase.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
            WalletError::InvalidKey(format!("unsupported multibase encoding: {}", self.0))
        })?;
        let decoded = bs58::decode(encoded)
            .with_alphabet(bs58::Alphabet::BITCOIN)
            .into_vec()
            .map_err(|e| WalletError::InvalidKey(format!("base58btc decoding failed: {e}")))?;

        if decoded.len() != ED25519_MULTICODEC.len() + PUBLIC_KEY_LEN
            || decoded[..2] != ED25519_MULTICODEC
        {
            return Err(WalletError::InvalidKey(format!(
                "unsupported multicodec key in {}",
                self.0
            )));
        }

        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&decoded[2..]);
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON Web Key form of an Ed25519 public key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_jwk: PublicKeyJwk,
}

/// A DID Document describing the holder's verification key.
///
/// Follows the basic shape of the [DID Core Specification](https://www.w3.org/TR/did-core/)
/// with a single key usable for authentication and assertions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    /// Builds the document for a `did:key` and its raw public key bytes.
    pub fn for_key(did: &Did, public_key: &[u8]) -> Self {
        let key_id = format!("{did}#key-1");
        let jwk = PublicKeyJwk {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: base64::encode_config(public_key, base64::URL_SAFE_NO_PAD),
        };

        DidDocument {
            context: vec!["https://www.w3.org/ns/did/v1".to_string()],
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                method_type: "Ed25519VerificationKey2018".to_string(),
                controller: did.to_string(),
                public_key_jwk: jwk,
            }],
            authentication: vec![key_id.clone()],
            assertion_method: vec![key_id],
        }
    }
}
