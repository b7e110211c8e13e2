use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::error::{Result, ScanError};

/// Read buffer size used while hashing.
pub const CHUNK_SIZE: usize = 8192;

/// Size plus BLAKE3 digest of a file's bytes.
///
/// Two files are treated as duplicates iff their identities are equal. The
/// size field comes first so the derived comparison rejects files of
/// different length before touching the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentIdentity {
    pub size: u64,
    pub digest: [u8; 32],
}

impl ContentIdentity {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len() as u64,
            digest: *blake3::hash(bytes).as_bytes(),
        }
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.digest).to_hex().to_string()
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.size, self.to_hex())
    }
}

/// Streams `file_path` through BLAKE3 in `CHUNK_SIZE` pieces.
///
/// The size is the number of bytes actually hashed, so a file that changes
/// length between `stat` and `read` still gets a self-consistent identity.
pub fn fingerprint_file(file_path: &Path) -> Result<ContentIdentity> {
    let read_error = |source| ScanError::Read {
        path: file_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::open(file_path).map_err(read_error)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    let identity = ContentIdentity {
        size,
        digest: *hasher.finalize().as_bytes(),
    };
    debug!("Fingerprint for '{}': {}", file_path.display(), identity);

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_identical_content_same_identity() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"hello");
        let b = write(&dir, "b.bin", b"hello");

        assert_eq!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn test_same_size_different_content() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"hello");
        let b = write(&dir, "b.txt", b"world");

        let ia = fingerprint_file(&a).unwrap();
        let ib = fingerprint_file(&b).unwrap();
        assert_eq!(ia.size, ib.size);
        assert_ne!(ia, ib);
    }

    #[test]
    fn test_streaming_matches_one_shot_hash() {
        let dir = TempDir::new().unwrap();
        // Spans several chunks with a ragged tail
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let path = write(&dir, "big.dat", &content);

        let identity = fingerprint_file(&path).unwrap();
        assert_eq!(identity, ContentIdentity::of_bytes(&content));
        assert_eq!(identity.size, content.len() as u64);
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty", b"");

        let identity = fingerprint_file(&path).unwrap();
        assert_eq!(identity.size, 0);
        assert_eq!(identity, ContentIdentity::of_bytes(b""));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("vanished.txt");

        match fingerprint_file(&missing) {
            Err(ScanError::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected read error, got {:?}", other),
        }
    }
}
