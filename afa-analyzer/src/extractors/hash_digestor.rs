//! Content digests of uploaded audio
//!
//! Hashes the original upload bytes (not the normalized waveform) so the
//! digests match what an examiner computes on the evidence file.

use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::HashDigest;
use crate::types::AnalysisError;

/// Read size per hashing step
const CHUNK_SIZE: usize = 1024 * 1024;

/// SHA-256 + MD5 digest of a byte stream
#[derive(Debug, Clone, Copy, Default)]
pub struct HashDigestor;

impl HashDigestor {
    pub fn new() -> Self {
        Self
    }

    /// Digest a stream in fixed-size chunks
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> Result<HashDigest, AnalysisError> {
        let mut hasher = DualHasher::default();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(AnalysisError::Io(e)),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finish())
    }

    pub fn digest_bytes(&self, bytes: &[u8]) -> HashDigest {
        let mut hasher = DualHasher::default();
        for chunk in bytes.chunks(CHUNK_SIZE) {
            hasher.update(chunk);
        }
        hasher.finish()
    }

    pub fn digest_file(&self, path: &Path) -> Result<HashDigest, AnalysisError> {
        let file = std::fs::File::open(path)?;
        self.digest_reader(file)
    }
}

#[derive(Default)]
struct DualHasher {
    sha256: Sha256,
    md5: Md5,
    byte_len: u64,
}

impl DualHasher {
    fn update(&mut self, chunk: &[u8]) {
        self.sha256.update(chunk);
        self.md5.update(chunk);
        self.byte_len += chunk.len() as u64;
    }

    fn finish(self) -> HashDigest {
        let digest = HashDigest {
            sha256: format!("{:x}", self.sha256.finalize()),
            md5: format!("{:x}", self.md5.finalize()),
            byte_len: self.byte_len,
        };
        debug!(sha256 = %digest.sha256, bytes = digest.byte_len, "Digest computed");
        digest
    }
}
