pub mod backend;
pub mod encryption;

pub use backend::{FileBackend, InMemoryBackend, StorageBackend};
pub use encryption::{Aes256GcmCipher, Cipher};
