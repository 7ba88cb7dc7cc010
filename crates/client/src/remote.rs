use bigfs_protocol::messages::{
    AckResponse, ChecksumRequest, ChecksumResponse, ChunkResponse, ListResponse, PathRequest,
    ReadChunkRequest, SizeResponse, WriteChunkRequest,
};
use bigfs_protocol::{MessageType, decode_bytes, encode_bytes};
use bigfs_transfer::{Chunk, DigestAlgorithm, RemoteFs, RemoteFuture};

use crate::ws_client::WsClient;

fn path_request(path: &str) -> PathRequest {
    PathRequest {
        path: path.to_string(),
    }
}

impl RemoteFs for WsClient {
    fn list<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, Vec<String>> {
        Box::pin(async move {
            let resp: ListResponse = self
                .call(MessageType::List, &path_request(path), MessageType::ListResponse)
                .await?;
            Ok(resp.entries)
        })
    }

    fn size<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, u64> {
        Box::pin(async move {
            let resp: SizeResponse = self
                .call(MessageType::Size, &path_request(path), MessageType::SizeResponse)
                .await?;
            Ok(resp.size)
        })
    }

    fn read_chunk<'a>(
        &'a self,
        path: &'a str,
        offset: u64,
        length: usize,
    ) -> RemoteFuture<'a, Chunk> {
        Box::pin(async move {
            let req = ReadChunkRequest {
                path: path.to_string(),
                offset,
                length: u32::try_from(length).unwrap_or(u32::MAX),
            };
            let resp: ChunkResponse = self
                .call(MessageType::ReadChunk, &req, MessageType::ChunkResponse)
                .await?;
            let data = decode_bytes(&resp.data)?;
            Ok(Chunk {
                offset: Some(offset),
                data,
                digest: Some(resp.digest),
            })
        })
    }

    fn reset<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let _: AckResponse = self
                .call(MessageType::Reset, &path_request(path), MessageType::Ack)
                .await?;
            Ok(())
        })
    }

    fn write_chunk<'a>(&'a self, path: &'a str, chunk: Chunk) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let req = WriteChunkRequest {
                path: path.to_string(),
                data: encode_bytes(&chunk.data),
                digest: chunk.digest,
                offset: chunk.offset,
            };
            let _: AckResponse = self
                .call(MessageType::WriteChunk, &req, MessageType::Ack)
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> RemoteFuture<'a, String> {
        Box::pin(async move {
            let resp: AckResponse = self
                .call(MessageType::Delete, &path_request(path), MessageType::Ack)
                .await?;
            Ok(resp.message)
        })
    }

    fn checksum<'a>(
        &'a self,
        path: &'a str,
        algorithm: DigestAlgorithm,
    ) -> RemoteFuture<'a, String> {
        Box::pin(async move {
            let req = ChecksumRequest {
                path: path.to_string(),
                algorithm: Some(algorithm.name().to_string()),
            };
            let resp: ChecksumResponse = self
                .call(MessageType::Checksum, &req, MessageType::ChecksumResponse)
                .await?;
            Ok(resp.digest)
        })
    }
}
