//! Abstraction over the remote store a session talks to.

use std::future::Future;
use std::pin::Pin;

use crate::codec::DigestAlgorithm;
use crate::types::Chunk;
use crate::TransferError;

/// A boxed future returned by [`RemoteFs`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// The logical RPC surface of a remote file store.
///
/// Every call is a single request that runs to completion on the server.
/// Paths are relative to the server's shared root.
pub trait RemoteFs: Send + Sync {
    /// Entry names of a remote directory.
    fn list<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, Vec<String>>;

    /// Size of a remote file in bytes.
    fn size<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, u64>;

    /// Up to `length` bytes starting at `offset`. An empty chunk marks the
    /// end of the file.
    fn read_chunk<'a>(&'a self, path: &'a str, offset: u64, length: usize)
    -> RemoteFuture<'a, Chunk>;

    /// Creates or truncates a remote file.
    fn reset<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, ()>;

    /// Appends one chunk to a remote file.
    fn write_chunk<'a>(&'a self, path: &'a str, chunk: Chunk) -> RemoteFuture<'a, ()>;

    /// Removes a remote file; returns the server's confirmation message.
    fn delete<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, String>;

    /// Whole-file hex digest computed by the server.
    fn checksum<'a>(
        &'a self,
        path: &'a str,
        algorithm: DigestAlgorithm,
    ) -> RemoteFuture<'a, String>;
}
