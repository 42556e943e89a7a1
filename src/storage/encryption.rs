// src/storage/encryption.rs
//! Authenticated encryption applied to every collection before it is written.
//!
//! The store depends only on the [`Cipher`] trait, so the AES-256-GCM default
//! can be swapped for a platform keystore or hardware-backed cipher without
//! touching store logic.

use crate::error::{Result, WalletError};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

const NONCE_SIZE: usize = 12;
pub const KEY_SIZE: usize = 32;

/// Symmetric authenticated encryption over opaque byte blobs.
pub trait Cipher: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Reverses [`Cipher::seal`]. Tampered or truncated input must fail; the
    /// store reports that failure as corruption.
    fn open(&self, blob: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// AES-256-GCM with a random 96-bit nonce per write.
///
/// Blob layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
pub struct Aes256GcmCipher {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl Aes256GcmCipher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key: Zeroizing::new(key) }
    }

    /// Parses a 64-character hex key (optional `0x` prefix).
    pub fn from_hex(key: &str) -> Result<Self> {
        let trimmed = key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(trimmed)
                .map_err(|e| WalletError::Config(format!("encryption key is not hex: {e}")))?,
        );
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            WalletError::Config(format!(
                "encryption key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Generates a random key; the caller is responsible for keeping it.
    pub fn generate_key() -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        OsRng
            .try_fill_bytes(&mut key[..])
            .map_err(|e| WalletError::KeyGeneration(format!("entropy source unavailable: {e}")))?;
        Ok(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(&self.key[..]))
    }
}

impl Cipher for Aes256GcmCipher {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| WalletError::Storage(format!("nonce generation failed: {e}")))?;

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| WalletError::Storage(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn open(&self, blob: &[u8]) -> std::result::Result<Vec<u8>, String> {
        if blob.len() < NONCE_SIZE {
            return Err(format!("ciphertext too short ({} bytes)", blob.len()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| "authentication failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Aes256GcmCipher {
        Aes256GcmCipher::new([0x42; KEY_SIZE])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let c = test_cipher();
        let blob = c.seal(b"[]").unwrap();
        assert_eq!(c.open(&blob).unwrap(), b"[]");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let c = test_cipher();
        assert_ne!(c.seal(b"same").unwrap(), c.seal(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = test_cipher().seal(b"secret").unwrap();
        assert!(Aes256GcmCipher::new([0x43; KEY_SIZE]).open(&blob).is_err());
    }

    #[test]
    fn test_tampered_and_truncated_fail() {
        let c = test_cipher();
        let mut blob = c.seal(b"integrity").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(c.open(&blob).is_err());
        assert!(c.open(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_from_hex() {
        assert!(Aes256GcmCipher::from_hex(&"ab".repeat(32)).is_ok());
        assert!(Aes256GcmCipher::from_hex(&format!("0x{}", "ab".repeat(32))).is_ok());
        assert!(matches!(Aes256GcmCipher::from_hex("abcd"), Err(WalletError::Config(_))));
        assert!(matches!(Aes256GcmCipher::from_hex("zz"), Err(WalletError::Config(_))));
    }
}
