//! Client-side transfer loops.
//!
//! Both sessions are ephemeral: they live for one `run` call and keep the
//! offset locally. The server sees only independent chunk requests.

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::codec::{DigestAlgorithm, checksum_file};
use crate::progress::{ProgressCallback, SpeedCalculator, TransferProgress};
use crate::remote::RemoteFs;
use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Tunables shared by both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bytes requested or sent per chunk (0 falls back to the default).
    pub chunk_size: usize,
    /// Sign uploaded chunks and check downloaded ones.
    pub verify_chunks: bool,
    /// Pin every uploaded chunk to its offset so the server rejects
    /// reordered or duplicated deliveries.
    pub enforce_order: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            verify_chunks: true,
            enforce_order: true,
        }
    }
}

impl TransferOptions {
    fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

/// Download state machine: `Idle -> Sizing -> Streaming -> Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Sizing,
    Streaming,
    Done,
    Failed,
}

/// Upload state machine: `Idle -> Reset -> Sending -> Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Reset,
    Sending,
    Done,
    Failed,
}

/// Offset and progress bookkeeping shared by both loops.
struct Tracker {
    offset: u64,
    total_size: u64,
    bytes_moved: u64,
    speed: SpeedCalculator,
    on_progress: Option<ProgressCallback>,
}

impl Tracker {
    fn new() -> Self {
        Self {
            offset: 0,
            total_size: 0,
            bytes_moved: 0,
            speed: SpeedCalculator::default(),
            on_progress: None,
        }
    }

    fn advance(&mut self, n: usize) {
        self.offset += n as u64;
        self.bytes_moved += n as u64;
        self.speed.add_sample(n as u64);
        let snapshot = self.snapshot();
        if let Some(cb) = self.on_progress.as_mut() {
            cb(&snapshot);
        }
    }

    fn snapshot(&self) -> TransferProgress {
        TransferProgress {
            bytes_moved: self.bytes_moved,
            total_size: self.total_size,
            bytes_per_second: self.speed.bytes_per_second(),
        }
    }
}

// ---------------------------------------------------------------------------
// DownloadSession
// ---------------------------------------------------------------------------

/// Copies one remote file to a local path, chunk by chunk.
pub struct DownloadSession<'a, R: RemoteFs + ?Sized> {
    remote: &'a R,
    remote_path: String,
    options: TransferOptions,
    state: DownloadState,
    tracker: Tracker,
}

impl<'a, R: RemoteFs + ?Sized> DownloadSession<'a, R> {
    pub fn new(remote: &'a R, remote_path: impl Into<String>, options: TransferOptions) -> Self {
        Self {
            remote,
            remote_path: remote_path.into(),
            options,
            state: DownloadState::Idle,
            tracker: Tracker::new(),
        }
    }

    /// Registers a callback invoked after every received chunk.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.tracker.on_progress = Some(callback);
        self
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn bytes_moved(&self) -> u64 {
        self.tracker.bytes_moved
    }

    /// Size reported by the server before streaming started.
    pub fn total_size(&self) -> u64 {
        self.tracker.total_size
    }

    pub fn progress(&self) -> TransferProgress {
        self.tracker.snapshot()
    }

    /// Runs the download into `dest`, returning the number of bytes written.
    ///
    /// The local file is created only after the remote size is known; a
    /// failure while streaming leaves the partial local file in place.
    pub async fn run(&mut self, dest: &Path) -> Result<u64, TransferError> {
        match self.stream(dest).await {
            Ok(n) => {
                self.state = DownloadState::Done;
                info!(remote = %self.remote_path, dest = %dest.display(), bytes = n, "download finished");
                Ok(n)
            }
            Err(e) => {
                self.state = DownloadState::Failed;
                warn!(remote = %self.remote_path, error = %e, "download failed");
                Err(e)
            }
        }
    }

    async fn stream(&mut self, dest: &Path) -> Result<u64, TransferError> {
        self.state = DownloadState::Sizing;
        self.tracker.total_size = self.remote.size(&self.remote_path).await?;
        debug!(remote = %self.remote_path, size = self.tracker.total_size, "remote size");

        let mut file = tokio::fs::File::create(dest).await?;
        self.state = DownloadState::Streaming;
        let chunk_size = self.options.effective_chunk_size();

        loop {
            let chunk = self
                .remote
                .read_chunk(&self.remote_path, self.tracker.offset, chunk_size)
                .await?;

            // The empty chunk is the end signal, even if the file changed size.
            if chunk.is_empty() {
                break;
            }

            if self.options.verify_chunks {
                chunk.verify()?;
            }

            file.write_all(&chunk.data).await?;
            self.tracker.advance(chunk.len());
        }

        file.flush().await?;
        Ok(self.tracker.bytes_moved)
    }
}

// ---------------------------------------------------------------------------
// UploadSession
// ---------------------------------------------------------------------------

/// Copies one local file to a remote path, chunk by chunk.
pub struct UploadSession<'a, R: RemoteFs + ?Sized> {
    remote: &'a R,
    remote_path: String,
    options: TransferOptions,
    state: UploadState,
    tracker: Tracker,
}

impl<'a, R: RemoteFs + ?Sized> UploadSession<'a, R> {
    pub fn new(remote: &'a R, remote_path: impl Into<String>, options: TransferOptions) -> Self {
        Self {
            remote,
            remote_path: remote_path.into(),
            options,
            state: UploadState::Idle,
            tracker: Tracker::new(),
        }
    }

    /// Registers a callback invoked after every acknowledged chunk.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.tracker.on_progress = Some(callback);
        self
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn bytes_moved(&self) -> u64 {
        self.tracker.bytes_moved
    }

    /// Size of the local source when the upload started.
    pub fn total_size(&self) -> u64 {
        self.tracker.total_size
    }

    pub fn progress(&self) -> TransferProgress {
        self.tracker.snapshot()
    }

    /// Runs the upload from `src`, returning the number of bytes sent.
    ///
    /// The remote file is always truncated first. On failure it keeps
    /// every chunk acknowledged before the error; a new upload must start
    /// over from the reset.
    pub async fn run(&mut self, src: &Path) -> Result<u64, TransferError> {
        match self.send(src).await {
            Ok(n) => {
                self.state = UploadState::Done;
                info!(src = %src.display(), remote = %self.remote_path, bytes = n, "upload finished");
                Ok(n)
            }
            Err(e) => {
                self.state = UploadState::Failed;
                warn!(remote = %self.remote_path, offset = self.tracker.offset, error = %e, "upload failed");
                Err(e)
            }
        }
    }

    async fn send(&mut self, src: &Path) -> Result<u64, TransferError> {
        let mut file = tokio::fs::File::open(src).await?;
        self.tracker.total_size = file.metadata().await?.len();

        self.state = UploadState::Reset;
        self.remote.reset(&self.remote_path).await?;

        self.state = UploadState::Sending;
        let mut buf = vec![0u8; self.options.effective_chunk_size()];

        loop {
            let n = read_full(&mut file, &mut buf).await?;
            if n == 0 {
                break;
            }

            let mut chunk = Chunk::new(buf[..n].to_vec());
            if self.options.enforce_order {
                chunk = chunk.at(self.tracker.offset);
            }
            if self.options.verify_chunks {
                chunk = chunk.signed();
            }

            self.remote.write_chunk(&self.remote_path, chunk).await?;
            self.tracker.advance(n);
        }

        Ok(self.tracker.bytes_moved)
    }
}

/// Fills `buf` from `file`, stopping early only at end of file.
async fn read_full(file: &mut tokio::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Compares the SHA-256 of a local file with the server's digest of
/// `remote_path`.
pub async fn verify_remote_checksum<R: RemoteFs + ?Sized>(
    remote: &R,
    remote_path: &str,
    local_path: &Path,
) -> Result<bool, TransferError> {
    let local = local_path.to_path_buf();
    let local_digest =
        tokio::task::spawn_blocking(move || checksum_file(DigestAlgorithm::Sha256, &local))
            .await
            .map_err(std::io::Error::other)??;
    let remote_digest = remote
        .checksum(remote_path, DigestAlgorithm::Sha256)
        .await?;
    Ok(local_digest.eq_ignore_ascii_case(&remote_digest))
}
