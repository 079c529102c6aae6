use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 256KB reads keep memory flat no matter how large the recording is.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Stream `reader` through BLAKE3 in `chunk_size` reads and return the hex digest.
///
/// The digest depends only on the bytes read, never on `chunk_size`.
/// A failed read aborts the whole hash; no partial digest is returned.
pub fn hash_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

pub fn hash_file(path: &Path, chunk_size: usize) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(file, chunk_size)
}
