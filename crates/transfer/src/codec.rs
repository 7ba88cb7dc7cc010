use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

/// Buffer size used when hashing a stream.
const HASH_BUFFER_SIZE: usize = 4096;

/// Error returned for an algorithm name the codec does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported checksum algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

/// Hash algorithms available for chunk and file digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Canonical lowercase name, as used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn hasher(self) -> StreamHasher {
        match self {
            Self::Sha256 => StreamHasher::Sha256(Sha256::new()),
            Self::Sha512 => StreamHasher::Sha512(Sha512::new()),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum StreamHasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl StreamHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    checksum_bytes_with(DigestAlgorithm::Sha256, data)
}

/// Computes the digest of `data` with the given algorithm.
pub fn checksum_bytes_with(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    hasher.finalize_hex()
}

/// Returns `true` if `expected` is the SHA-256 digest of exactly `data`.
///
/// Hex comparison ignores case.
pub fn verify(data: &[u8], expected: &str) -> bool {
    verify_with(DigestAlgorithm::Sha256, data, expected)
}

/// Returns `true` if `expected` is the digest of `data` under `algorithm`.
pub fn verify_with(algorithm: DigestAlgorithm, data: &[u8], expected: &str) -> bool {
    checksum_bytes_with(algorithm, data).eq_ignore_ascii_case(expected.trim())
}

/// Hashes everything `reader` yields.
pub fn checksum_reader<R: Read>(
    algorithm: DigestAlgorithm,
    mut reader: R,
) -> std::io::Result<String> {
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; HASH_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Computes the digest of an entire file.
pub fn checksum_file(algorithm: DigestAlgorithm, path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    checksum_reader(algorithm, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn checksum_bytes_known_vector() {
        assert_eq!(
            checksum_bytes(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn checksum_bytes_empty_input() {
        assert_eq!(
            checksum_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha512_digest_length() {
        let d = checksum_bytes_with(DigestAlgorithm::Sha512, b"abc");
        assert_eq!(d.len(), 128);
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let digest = checksum_bytes(b"chunk").to_uppercase();
        assert!(verify(b"chunk", &digest));
    }

    #[test]
    fn verify_rejects_other_bytes() {
        let digest = checksum_bytes(b"chunk");
        assert!(!verify(b"chunK", &digest));
        assert!(!verify(b"chunk", "deadbeef"));
    }

    #[test]
    fn algorithm_parsing() {
        assert_eq!("SHA256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
        assert_eq!("sha-512".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha512));
        assert_eq!(
            "md5".parse::<DigestAlgorithm>(),
            Err(UnsupportedAlgorithm("md5".into()))
        );
        assert_eq!(DigestAlgorithm::default().to_string(), "sha256");
    }

    #[test]
    fn checksum_file_matches_bytes_across_buffer_boundary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&data)
            .unwrap();

        let from_file = checksum_file(DigestAlgorithm::Sha256, &path).unwrap();
        assert_eq!(from_file, checksum_bytes(&data));
    }

    #[test]
    fn checksum_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = checksum_file(DigestAlgorithm::Sha256, &dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
