//! Content hashing: bytes, files, and canonical directory trees.
//!
//! Everything here is SHA-256. `Hash` is a typed 32-byte digest rather than a
//! bare `String` so hex/SRI encoding and decoding are total functions on a
//! value instead of ad hoc string formatting scattered across call sites.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("failed to read file: {0}")]
    FileReadError(std::path::PathBuf),

    #[error("invalid hash format: expected 64 hex characters, got {0:?}")]
    InvalidHashFormat(String),
}

/// A 256-bit SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn zero() -> Self {
        Hash([0u8; 32])
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hash_to_hex(*self))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hash_to_hex(*self))
    }
}

/// A verification record returned by the `verify_*` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub valid: bool,
    pub expected_hex: String,
    pub actual_hex: String,
}

pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Hash(hasher.finalize().into())
}

pub fn hash_file(path: &Path) -> Result<Hash, IntegrityError> {
    let file = File::open(path).map_err(|_| IntegrityError::FileReadError(path.to_path_buf()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|_| IntegrityError::FileReadError(path.to_path_buf()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(Hash(hasher.finalize().into()))
}

/// Canonical directory hash. Skips dot-directories and Zig build-cache
/// directories (content-neutral artifacts), collects regular-file paths,
/// sorts them byte-wise, then folds `(path bytes, file digest bytes)` pairs
/// into one hasher — so iteration order never affects the result.
pub fn hash_directory(root: &Path) -> Result<Hash, IntegrityError> {
    let mut paths: Vec<std::path::PathBuf> = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e.path()))
    {
        let entry = entry.map_err(|_| IntegrityError::FileReadError(root.to_path_buf()))?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            paths.push(rel);
        }
    }

    paths.sort_by(|a, b| a.as_os_str().as_encoded_bytes().cmp(b.as_os_str().as_encoded_bytes()));

    let mut hasher = Sha256::new();
    for rel in paths {
        let abs = root.join(&rel);
        let file_hash = hash_file(&abs)?;
        hasher.update(rel.as_os_str().as_encoded_bytes());
        hasher.update(file_hash.as_bytes());
    }

    Ok(Hash(hasher.finalize().into()))
}

fn is_skipped_dir(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') || name == "zig-cache" || name == "zig-out",
        None => false,
    }
}

pub fn hash_to_hex(h: Hash) -> String {
    hex::encode(h.0)
}

pub fn hex_to_hash(s: &str) -> Result<Hash, IntegrityError> {
    if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IntegrityError::InvalidHashFormat(s.to_string()));
    }
    let bytes = hex::decode(s).map_err(|_| IntegrityError::InvalidHashFormat(s.to_string()))?;
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(Hash(arr))
}

pub fn to_sri(h: Hash) -> String {
    format!(
        "sha256-{}",
        base64::engine::general_purpose::STANDARD.encode(h.0)
    )
}

pub fn from_sri(s: &str) -> Result<Hash, IntegrityError> {
    let b64 = s
        .strip_prefix("sha256-")
        .ok_or_else(|| IntegrityError::InvalidHashFormat(s.to_string()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| IntegrityError::InvalidHashFormat(s.to_string()))?;
    if bytes.len() != 32 {
        return Err(IntegrityError::InvalidHashFormat(s.to_string()));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(Hash(arr))
}

pub fn verify_bytes(data: &[u8], expected: Hash) -> VerifyResult {
    let actual = hash_bytes(data);
    VerifyResult {
        valid: actual == expected,
        expected_hex: hash_to_hex(expected),
        actual_hex: hash_to_hex(actual),
    }
}

pub fn verify_file(path: &Path, expected: Hash) -> Result<VerifyResult, IntegrityError> {
    let actual = hash_file(path)?;
    Ok(VerifyResult {
        valid: actual == expected,
        expected_hex: hash_to_hex(expected),
        actual_hex: hash_to_hex(actual),
    })
}

pub fn verify_file_hex(path: &Path, expected_hex: &str) -> Result<VerifyResult, IntegrityError> {
    let expected = hex_to_hash(expected_hex)?;
    verify_file(path, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hash_bytes_matches_known_vector() {
        let h = hash_bytes(b"hello world");
        assert_eq!(
            hash_to_hex(h),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn verify_bytes_roundtrips() {
        let data = b"some package contents";
        let h = hash_bytes(data);
        assert!(verify_bytes(data, h).valid);
    }

    #[test]
    fn hex_roundtrip() {
        let h = hash_bytes(b"abc");
        let hex = hash_to_hex(h);
        assert_eq!(hex_to_hash(&hex).unwrap(), h);
    }

    #[test]
    fn sri_roundtrip() {
        let h = hash_bytes(b"abc");
        let sri = to_sri(h);
        assert!(sri.starts_with("sha256-"));
        assert_eq!(from_sri(&sri).unwrap(), h);
    }

    #[test]
    fn zero_hash_hex_is_64_zeros() {
        assert_eq!(hash_to_hex(Hash::zero()), "0".repeat(64));
    }

    #[test]
    fn hex_to_hash_rejects_bad_input() {
        assert!(hex_to_hash("not hex").is_err());
        assert!(hex_to_hash(&"a".repeat(63)).is_err());
        assert!(hex_to_hash(&"g".repeat(64)).is_err());
    }

    #[test]
    fn directory_hash_is_order_independent() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("a.txt"), "aaa").unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), "bbb").unwrap();

        let h1 = hash_directory(tmp.path()).unwrap();
        let h2 = hash_directory(tmp.path()).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn directory_hash_skips_dot_and_zig_cache_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "aaa").unwrap();

        let baseline = hash_directory(tmp.path()).unwrap();

        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(tmp.path().join("zig-cache")).unwrap();
        std::fs::write(tmp.path().join("zig-cache/tmp"), "junk").unwrap();

        let after = hash_directory(tmp.path()).unwrap();
        assert_eq!(baseline, after);
    }
}
