//! Content hashing
//!
//! Every hash in a bead (file entries in the manifest, the manifest itself
//! as the bead's content id) is a SHA-512 over the declared length, a NUL
//! byte, then the content. Including the length keeps the digest of a
//! truncated stream distinct from the digest of the full one.

use sha2::{Digest, Sha512};
use std::io::{self, Read};

const BLOCK_SIZE: usize = 64 * 1024;

/// Incremental hasher for a byte stream of known length
pub struct ContentHasher {
    inner: Sha512,
    expected: u64,
    seen: u64,
}

impl ContentHasher {
    pub fn new(len: u64) -> Self {
        let mut inner = Sha512::new();
        inner.update(format!("{}\0", len).as_bytes());
        ContentHasher {
            inner,
            expected: len,
            seen: 0,
        }
    }

    pub fn update(&mut self, block: &[u8]) {
        self.seen += block.len() as u64;
        self.inner.update(block);
    }

    /// Lowercase hex digest
    ///
    /// Fails if the stream did not deliver exactly the declared length.
    pub fn finish(self) -> io::Result<String> {
        if self.seen != self.expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, hashed {}", self.expected, self.seen),
            ));
        }
        Ok(hex::encode(self.inner.finalize()))
    }
}

/// Hash an in-memory buffer
pub fn bytes(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new(data.len() as u64);
    hasher.update(data);
    hex::encode(hasher.inner.finalize())
}

/// Hash the next `len` bytes of `reader`
pub fn reader<R: Read>(reader: R, len: u64) -> io::Result<String> {
    let mut hasher = ContentHasher::new(len);
    let mut limited = reader.take(len);
    let mut buffer = vec![0u8; BLOCK_SIZE];
    loop {
        let n = limited.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_is_deterministic() {
        assert_eq!(bytes(b"hello"), bytes(b"hello"));
        assert_ne!(bytes(b"hello"), bytes(b"hellO"));
    }

    #[test]
    fn test_reader_matches_bytes() {
        let data = vec![7u8; 3 * BLOCK_SIZE + 11];
        let streamed = reader(&data[..], data.len() as u64).unwrap();
        assert_eq!(streamed, bytes(&data));
    }

    #[test]
    fn test_length_is_part_of_digest() {
        // 128 hex chars for SHA-512
        let digest = bytes(b"");
        assert_eq!(digest.len(), 128);
        assert_ne!(digest, hex::encode(Sha512::digest(b"")));
    }

    #[test]
    fn test_short_stream_is_an_error() {
        let result = reader(&b"abc"[..], 10);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }
}
