//! Content hashing with BLAKE3 and SHA-256.
//!
//! BLAKE3 is the digest recorded with every matched file, in the report and
//! in `report_only_match` / `action_completed` audit events. SHA-256 is
//! streamed on its own for `Sha256` conditions, and can also be recorded
//! next to BLAKE3 for signature lists keyed by SHA-256.

use crate::core::error::LookupError;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Digests of one file's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    /// BLAKE3 digest, lowercase hex.
    pub blake3: String,

    /// SHA-256 digest, lowercase hex, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// Streams file contents through the configured digests in one pass.
///
/// # Examples
///
/// ```rust
/// use remediate::core::FileHasher;
///
/// let digest = FileHasher::new().with_sha256(true).hash_bytes(b"hello world");
/// assert_eq!(
///     digest.sha256.as_deref(),
///     Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileHasher {
    compute_sha256: bool,
}

impl FileHasher {
    /// Creates a hasher computing BLAKE3 only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables SHA-256.
    pub fn with_sha256(mut self, enabled: bool) -> Self {
        self.compute_sha256 = enabled;
        self
    }

    /// Returns whether SHA-256 computation is enabled.
    pub fn computes_sha256(&self) -> bool {
        self.compute_sha256
    }

    /// Hashes an in-memory buffer.
    pub fn hash_bytes(&self, data: &[u8]) -> FileDigest {
        let blake3 = blake3::hash(data).to_hex().to_string();
        let sha256 = self
            .compute_sha256
            .then(|| hex_lower(&Sha256::digest(data)));
        FileDigest { blake3, sha256 }
    }

    /// Hashes a file without loading it into memory.
    pub fn hash_file(&self, path: &Path) -> Result<FileDigest, LookupError> {
        let file = std::fs::File::open(path).map_err(|e| LookupError::from_io(path, e))?;
        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Streams a file through SHA-256 alone.
    pub fn sha256_file(path: &Path) -> Result<String, LookupError> {
        let file = std::fs::File::open(path).map_err(|e| LookupError::from_io(path, e))?;
        let mut reader = std::io::BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(hex_lower(&hasher.finalize()))
    }

    /// Hashes everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<FileDigest, LookupError> {
        let mut blake3_hasher = blake3::Hasher::new();
        let mut sha256_hasher = self.compute_sha256.then(Sha256::new);

        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            let chunk = &buffer[..bytes_read];
            blake3_hasher.update(chunk);
            if let Some(h) = sha256_hasher.as_mut() {
                h.update(chunk);
            }
        }

        Ok(FileDigest {
            blake3: blake3_hasher.finalize().to_hex().to_string(),
            sha256: sha256_hasher.map(|h| hex_lower(&h.finalize())),
        })
    }
}

/// Lowercase hex encoding.
pub(crate) fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_blake3_only_by_default() {
        let digest = FileHasher::new().hash_bytes(b"hello world");
        assert_eq!(digest.blake3.len(), 64);
        assert_eq!(digest.sha256, None);
    }

    #[test]
    fn test_known_sha256() {
        let digest = FileHasher::new().with_sha256(true).hash_bytes(b"");
        assert_eq!(
            digest.sha256.as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_file_and_bytes_agree() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"streamed contents").unwrap();

        let hasher = FileHasher::new().with_sha256(true);
        let from_file = hasher.hash_file(file.path()).unwrap();
        let from_bytes = hasher.hash_bytes(b"streamed contents");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_sha256_file_matches_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        assert_eq!(
            FileHasher::sha256_file(file.path()).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(matches!(
            FileHasher::sha256_file(Path::new("/no/such/file")),
            Err(LookupError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = FileHasher::new().hash_file(Path::new("/no/such/file"));
        assert!(matches!(result, Err(LookupError::NotFound { .. })));
    }

    #[test]
    fn test_hex_lower() {
        assert_eq!(hex_lower(&[0xca, 0xfe, 0x01]), "cafe01");
    }
}
