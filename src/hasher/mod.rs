mod stream;

pub use stream::{hash_file, hash_reader, DEFAULT_CHUNK_SIZE};

use std::io;
use std::path::Path;

/// Produces the content fingerprint the scan engine stores with each record.
pub trait ContentHasher: Send + Sync {
    fn fingerprint(&self, path: &Path) -> io::Result<String>;
}

/// BLAKE3 over the whole file, streamed in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct Blake3Hasher {
    chunk_size: usize,
}

impl Blake3Hasher {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentHasher for Blake3Hasher {
    fn fingerprint(&self, path: &Path) -> io::Result<String> {
        hash_file(path, self.chunk_size)
    }
}
