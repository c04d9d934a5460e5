//! BLAKE3 digests for produced artifacts

use std::path::Path;

use blake3::Hasher;

use crate::error::{Result, fs as fs_error};
use crate::storage::Storage;

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Calculate the prefixed BLAKE3 hash of `bytes`
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex())
}

/// Calculate the BLAKE3 hash of a file, returning it with its size in bytes
pub fn hash_file<S: Storage + ?Sized>(storage: &S, path: &Path) -> Result<(String, u64)> {
    let bytes = storage
        .read(path)
        .map_err(|e| fs_error::read_failed(path, &e))?;
    Ok((hash_bytes(&bytes), bytes.len() as u64))
}
