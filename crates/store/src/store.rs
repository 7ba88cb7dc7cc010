//! Primitive file operations against the sandboxed shared directory.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bigfs_transfer::{DigestAlgorithm, checksum_bytes, checksum_file, verify};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;
use crate::guard::ConcurrencyGuard;
use crate::sandbox::PathSandbox;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory all operations are confined to.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/bigfs"),
        }
    }
}

/// The sole reader and writer of the shared directory.
///
/// Read-only calls (`list`, `size`, `read_chunk`) take no lock and may
/// observe a write in progress. `reset`, `append`, `write_chunk`, `delete`
/// and `checksum` are serialized per resolved path.
#[derive(Debug)]
pub struct FileStore {
    sandbox: PathSandbox,
    guard: ConcurrencyGuard,
}

impl FileStore {
    /// Opens the store, creating the root directory if needed.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let sandbox = PathSandbox::new(&config.root)?;
        info!(root = %sandbox.root().display(), "file store opened");
        Ok(Self {
            sandbox,
            guard: ConcurrencyGuard::new(),
        })
    }

    /// Canonical path of the shared root.
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    /// Entry names of `subdir`, in directory enumeration order.
    pub fn list(&self, subdir: &str) -> Result<Vec<String>, StoreError> {
        let path = self.sandbox.resolve(subdir)?;
        let meta = std::fs::metadata(&path).map_err(|e| io_error(subdir, e))?;
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory(subdir.to_string()));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&path).map_err(|e| io_error(subdir, e))? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        debug!(path = %subdir, entries = names.len(), "listed directory");
        Ok(names)
    }

    /// Size of a regular file in bytes.
    pub fn size(&self, path: &str) -> Result<u64, StoreError> {
        let abs = self.sandbox.resolve(path)?;
        Ok(regular_file_meta(&abs, path)?.len())
    }

    /// Reads up to `max_len` bytes starting at `offset`.
    ///
    /// Returns an empty vector once `offset` reaches the end of the file.
    pub fn read_chunk(
        &self,
        path: &str,
        offset: u64,
        max_len: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let abs = self.sandbox.resolve(path)?;
        let len = regular_file_meta(&abs, path)?.len();
        if offset >= len || max_len == 0 {
            return Ok(Vec::new());
        }

        let mut file = File::open(&abs).map_err(|e| io_error(path, e))?;
        file.seek(SeekFrom::Start(offset))?;
        let want = (len - offset).min(max_len as u64);
        let mut buf = Vec::with_capacity(want as usize);
        file.take(want).read_to_end(&mut buf)?;
        debug!(path = %path, offset, len = buf.len(), "read chunk");
        Ok(buf)
    }

    /// Creates `path` empty, or truncates it, creating parent directories.
    pub fn reset(&self, path: &str) -> Result<(), StoreError> {
        let abs = self.sandbox.resolve(path)?;
        self.guard.with_lock(&abs, || {
            create_parent(&abs, path)?;
            File::create(&abs).map_err(|e| io_error(path, e))?;
            info!(path = %path, "file reset");
            Ok(())
        })
    }

    /// Blind append; creates the file (and parents) if missing.
    pub fn append(&self, path: &str, data: &[u8]) -> Result<u64, StoreError> {
        self.write_chunk(path, data, None, None)
    }

    /// Appends one chunk, returning the new file length.
    ///
    /// With `digest`, the bytes are verified first and a mismatch leaves the
    /// file untouched. With `expected_offset`, the chunk is rejected unless
    /// the file currently ends exactly there.
    pub fn write_chunk(
        &self,
        path: &str,
        data: &[u8],
        digest: Option<&str>,
        expected_offset: Option<u64>,
    ) -> Result<u64, StoreError> {
        let abs = self.sandbox.resolve(path)?;

        self.guard.with_lock(&abs, || {
            if let Some(expected) = digest {
                if !verify(data, expected) {
                    return Err(StoreError::HashMismatch {
                        expected: expected.to_string(),
                        actual: checksum_bytes(data),
                    });
                }
            }

            let current = match std::fs::metadata(&abs) {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => return Err(StoreError::NotFound(path.to_string())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => return Err(io_error(path, e)),
            };
            if let Some(expected) = expected_offset {
                if expected != current {
                    return Err(StoreError::OffsetMismatch {
                        expected,
                        actual: current,
                    });
                }
            }

            create_parent(&abs, path)?;

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&abs)
                .map_err(|e| io_error(path, e))?;
            file.write_all(data)?;
            let new_len = current + data.len() as u64;
            debug!(path = %path, len = data.len(), new_len, "appended chunk");
            Ok(new_len)
        })
    }

    /// Removes a regular file.
    pub fn delete(&self, path: &str) -> Result<String, StoreError> {
        let abs = self.sandbox.resolve(path)?;
        self.guard.with_lock(&abs, || {
            regular_file_meta(&abs, path)?;
            std::fs::remove_file(&abs).map_err(|e| io_error(path, e))?;
            info!(path = %path, "file deleted");
            Ok(format!("{path} removed"))
        })
    }

    /// Whole-file hex digest, computed while writers are held off.
    pub fn checksum(&self, path: &str, algorithm: DigestAlgorithm) -> Result<String, StoreError> {
        let abs = self.sandbox.resolve(path)?;
        self.guard.with_lock(&abs, || {
            regular_file_meta(&abs, path)?;
            let digest = checksum_file(algorithm, &abs).map_err(|e| io_error(path, e))?;
            debug!(path = %path, %algorithm, "computed checksum");
            Ok(digest)
        })
    }
}

/// Metadata of `abs`, which must exist and be a regular file.
fn regular_file_meta(abs: &Path, rel: &str) -> Result<std::fs::Metadata, StoreError> {
    let meta = std::fs::metadata(abs).map_err(|e| io_error(rel, e))?;
    if !meta.is_file() {
        return Err(StoreError::NotFound(rel.to_string()));
    }
    Ok(meta)
}

fn create_parent(abs: &Path, rel: &str) -> Result<(), StoreError> {
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(rel, e))?;
    }
    Ok(())
}

/// Maps an I/O error to the store's typed errors.
fn io_error(rel: &str, e: std::io::Error) -> StoreError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound(rel.to_string()),
        std::io::ErrorKind::NotADirectory => StoreError::NotADirectory(rel.to_string()),
        _ => StoreError::Io(e),
    }
}
