//! Streaming content hashing for local files

use crate::config::DigestAlgorithm;
use crate::error::DigestError;
use crate::host::DigestProvider;
use crate::types::{Digest, FileEntry};
use sha2::Digest as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// [`DigestProvider`] that reads the entry's locator from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDigester {
    algorithm: DigestAlgorithm,
}

enum StreamHasher {
    Md5(md5::Context),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(md5::Context::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Md5(ctx) => ctx.consume(bytes),
            Self::Sha256(hasher) => hasher.update(bytes),
            Self::Blake3(hasher) => {
                hasher.update(bytes);
            }
        }
    }

    fn finish(self) -> Digest {
        match self {
            Self::Md5(ctx) => Digest::from_bytes(ctx.compute().0.to_vec()),
            Self::Sha256(hasher) => Digest::from_bytes(hasher.finalize().to_vec()),
            Self::Blake3(hasher) => Digest::from_bytes(hasher.finalize().as_bytes().to_vec()),
        }
    }
}

impl FileDigester {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hash the file at `path`
    pub fn hash_path(&self, path: &Path) -> std::io::Result<Digest> {
        let mut file = File::open(path)?;
        let mut hasher = StreamHasher::new(self.algorithm);
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finish())
    }
}

impl DigestProvider for FileDigester {
    fn compute(&self, file: &FileEntry) -> Result<Digest, DigestError> {
        self.hash_path(file.locator()).map_err(|source| DigestError::Io {
            path: file.locator().display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryKind, FileId};

    fn write_temp(content: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_md5_known_value() {
        let (_dir, path) = write_temp(b"hello");
        let digest = FileDigester::new(DigestAlgorithm::Md5).hash_path(&path).unwrap();
        assert_eq!(digest.to_hex(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_sha256_known_value() {
        let (_dir, path) = write_temp(b"hello");
        let digest = FileDigester::new(DigestAlgorithm::Sha256).hash_path(&path).unwrap();
        assert_eq!(
            digest.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_blake3_matches_one_shot() {
        // Larger than one chunk so the streaming path is exercised
        let content: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let (_dir, path) = write_temp(&content);
        let digest = FileDigester::new(DigestAlgorithm::Blake3).hash_path(&path).unwrap();
        assert_eq!(digest.as_bytes(), blake3::hash(&content).as_bytes());
    }

    #[test]
    fn test_missing_file_is_digest_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = FileEntry::new(FileId(1), "gone", "/", EntryKind::File, dir.path().join("gone"));
        let err = FileDigester::default().compute(&entry).unwrap_err();
        assert!(matches!(err, DigestError::Io { .. }));
    }
}
