//! Content hashing for rebuild detection
//!
//! Cache validity depends only on comparing a recorded digest against
//! the digest of the current source bytes, never on modification
//! timestamps. SHA-256 keeps collisions out of the picture.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::Result;

/// Size of the streaming read buffer.
const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-256 digest of a file's contents as a hex string.
///
/// The file is read in fixed-size chunks; arbitrarily large sources
/// never need to fit in memory.
pub fn source_digest(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 digest of an in-memory byte slice as a hex string.
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn file_digest_matches_byte_digest() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"int main(void) { return 0; }\n")?;
        file.flush()?;

        assert_eq!(
            source_digest(file.path())?,
            digest_bytes(b"int main(void) { return 0; }\n")
        );
        Ok(())
    }

    #[test]
    fn digest_is_hex_of_fixed_length() {
        let d = digest_bytes(b"");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn single_byte_flip_changes_digest() {
        let a = digest_bytes(b"static int counter = 0;");
        let b = digest_bytes(b"static int counter = 1;");
        assert_ne!(a, b);
    }

    #[test]
    fn large_input_spans_multiple_chunks() -> Result<()> {
        let data = vec![0x42u8; CHUNK_SIZE * 3 + 17];
        let mut file = NamedTempFile::new()?;
        file.write_all(&data)?;
        file.flush()?;

        assert_eq!(source_digest(file.path())?, digest_bytes(&data));
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = source_digest(Path::new("/nonexistent/source.c")).unwrap_err();
        assert!(matches!(err, crate::CoreError::Io(_)));
    }
}
