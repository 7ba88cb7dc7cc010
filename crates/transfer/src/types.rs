use crate::TransferError;
use crate::codec::{checksum_bytes, verify};

/// A bounded piece of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte position of the chunk. On writes, `Some` asks the server to
    /// check that the file currently ends exactly here.
    pub offset: Option<u64>,
    /// Raw chunk data.
    pub data: Vec<u8>,
    /// SHA-256 hex digest of `data` (`None` means no verification).
    pub digest: Option<String>,
}

impl Chunk {
    /// Creates an unaddressed, unsigned chunk.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            offset: None,
            data,
            digest: None,
        }
    }

    /// Pins the chunk to a byte offset.
    pub fn at(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attaches the SHA-256 digest of the current data.
    pub fn signed(mut self) -> Self {
        self.digest = Some(checksum_bytes(&self.data));
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks the attached digest, if any.
    pub fn verify(&self) -> Result<(), TransferError> {
        match &self.digest {
            Some(expected) if !verify(&self.data, expected) => Err(TransferError::HashMismatch {
                expected: expected.clone(),
                actual: checksum_bytes(&self.data),
            }),
            _ => Ok(()),
        }
    }
}
