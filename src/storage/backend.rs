// src/storage/backend.rs
//! Persistence backends for encrypted collection blobs.
//!
//! A backend only ever sees opaque ciphertext under fixed logical keys. All
//! addressing and encryption happen in the credential store.

use crate::error::{Result, WalletError};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One change in an atomic batch: `Some(blob)` writes, `None` removes.
pub type Change<'a> = (&'a str, Option<Vec<u8>>);

pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Applies every change or none of them.
    fn write_batch(&self, changes: &[Change<'_>]) -> Result<()>;

    fn write(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        self.write_batch(&[(key, Some(blob))])
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| WalletError::Storage(format!("lock poisoned: {e}")))
}

/// In-memory backend for tests and ephemeral wallets.
#[derive(Default)]
pub struct InMemoryBackend {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a raw blob, bypassing encryption (for corruption tests).
    pub fn insert_raw(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        lock(&self.data)?.insert(key.to_string(), blob);
        Ok(())
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.data)
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.data)?.get(key).cloned())
    }

    fn write_batch(&self, changes: &[Change<'_>]) -> Result<()> {
        let mut data = lock(&self.data)?;
        for (key, blob) in changes {
            match blob {
                Some(blob) => {
                    data.insert((*key).to_string(), blob.clone());
                }
                None => {
                    data.remove(*key);
                }
            }
        }
        Ok(())
    }
}

/// Single-file backend: a JSON object of base64 blobs keyed by collection.
///
/// Every batch rewrites the whole file through a temporary sibling and an
/// atomic rename, so a crash mid-write leaves the previous state intact.
pub struct FileBackend {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                WalletError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                WalletError::corruption("*", format!("store file {} is unreadable: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(WalletError::Storage(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec(entries)?;
        let io_err = |e: std::io::Error| {
            WalletError::Storage(format!("cannot write {}: {e}", tmp.display()))
        };

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| {
            WalletError::Storage(format!("cannot replace {}: {e}", self.path.display()))
        })
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = lock(&self.guard)?;
        match self.load()?.get(key) {
            Some(encoded) => base64::decode(encoded)
                .map(Some)
                .map_err(|e| WalletError::corruption(key, format!("invalid base64: {e}"))),
            None => Ok(None),
        }
    }

    fn write_batch(&self, changes: &[Change<'_>]) -> Result<()> {
        let _guard = lock(&self.guard)?;
        let removal_only = changes.iter().all(|(_, blob)| blob.is_none());
        let mut entries = match self.load() {
            Ok(entries) => entries,
            // Nothing survives a removal-only batch on an unreadable file.
            Err(WalletError::StorageCorruption { reason, .. }) if removal_only => {
                warn!("discarding unreadable store contents: {reason}");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        for (key, blob) in changes {
            match blob {
                Some(blob) => {
                    entries.insert((*key).to_string(), base64::encode(blob));
                }
                None => {
                    entries.remove(*key);
                }
            }
        }
        self.persist(&entries)
    }
}
