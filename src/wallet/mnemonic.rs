// src/wallet/mnemonic.rs
//! BIP-39 recovery phrases and SLIP-0010 Ed25519 key derivation.
//!
//! mnemonic -> 64-byte seed -> SLIP-0010 master -> hardened path -> Ed25519 secret
//!
//! SLIP-0010 is used instead of BIP-32 because Ed25519 only supports hardened
//! derivation.

use crate::error::{Result, WalletError};
use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroizing;

/// 128 bits of entropy gives a 12-word phrase.
const ENTROPY_BYTES: usize = 16;

const HARDENED: u32 = 0x8000_0000;

/// m/44'/60'/0'/0'/0'
pub const DERIVATION_PATH: [u32; 5] = [44, 60, 0, 0, 0];

/// Generates a fresh 12-word English mnemonic from OS entropy.
///
/// # Errors
/// `KeyGeneration` if the OS entropy source cannot be read.
pub fn generate_mnemonic() -> Result<Mnemonic> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
    OsRng
        .try_fill_bytes(&mut entropy[..])
        .map_err(|e| WalletError::KeyGeneration(format!("entropy source unavailable: {e}")))?;
    Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| WalletError::KeyGeneration(format!("failed to build mnemonic: {e}")))
}

/// Parses a phrase, checking the wordlist and checksum.
///
/// Surrounding whitespace, repeated spaces and letter case are normalized first.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic> {
    let normalized = phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    Mnemonic::parse_normalized(&normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Derives the wallet's 32-byte Ed25519 secret from a mnemonic (empty passphrase).
pub fn derive_secret_key(mnemonic: &Mnemonic) -> Result<Zeroizing<[u8; 32]>> {
    let seed = Zeroizing::new(mnemonic.to_seed_normalized(""));
    let mut node = Slip0010Node::master(&seed[..])?;
    for index in DERIVATION_PATH {
        node = node.derive_hardened(index)?;
    }
    Ok(node.secret_key)
}

struct Slip0010Node {
    secret_key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl Slip0010Node {
    fn master(seed: &[u8]) -> Result<Self> {
        Self::from_hmac(b"ed25519 seed", &[seed])
    }

    fn derive_hardened(&self, index: u32) -> Result<Self> {
        let index = (index | HARDENED).to_be_bytes();
        Self::from_hmac(
            &self.chain_code[..],
            &[&[0x00u8][..], &self.secret_key[..], &index[..]],
        )
    }

    fn from_hmac(key: &[u8], parts: &[&[u8]]) -> Result<Self> {
        let mut mac = Hmac::<Sha512>::new_from_slice(key)
            .map_err(|e| WalletError::KeyGeneration(format!("HMAC init failed: {e}")))?;
        for part in parts {
            mac.update(part);
        }
        let out = mac.finalize().into_bytes();

        let mut secret_key = Zeroizing::new([0u8; 32]);
        let mut chain_code = Zeroizing::new([0u8; 32]);
        secret_key.copy_from_slice(&out[..32]);
        chain_code.copy_from_slice(&out[32..]);
        Ok(Self { secret_key, chain_code })
    }
}
