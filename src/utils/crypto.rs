// src/utils/crypto.rs
//! Hashing helpers shared by address derivation and proof binding.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) so wallet addresses
//! stay compatible with the payment and contract side of the system.

use ethers_core::utils::keccak256;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Derives a `0x`-prefixed, lowercase 20-byte address from raw public key bytes.
///
/// The address is the trailing 20 bytes of `keccak256(public_key)`.
pub fn address_from_public_key(public_key: &[u8]) -> String {
    let hash = hash_data(public_key);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Normalizes an address for comparison (trimmed, lowercase, no `0x`).
pub fn normalize_address(address: &str) -> String {
    let a = address.trim().to_lowercase();
    a.strip_prefix("0x").map(str::to_string).unwrap_or(a)
}
