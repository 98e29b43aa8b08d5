//! Moving file bytes to the peer.
//!
//! Plaintext connections hand a file region to the kernel (`sendfile(2)` on Linux) so
//! the bytes never pass through user space. Encrypted connections can't do that: every
//! byte has to go through the TLS layer, so the file is read in [`CHUNK_SIZE`] pieces
//! that are encoded and flushed one at a time. Either way at most one chunk of file
//! content is held in memory and a slow peer pauses the transfer.

use std::fs::File;
use std::io;
use std::io::SeekFrom;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, DuplexStream, WriteHalf};
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, trace};

/// Size of the pieces a file is read in when it can't be transferred zero-copy.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// The write side of a connection.
#[async_trait]
pub trait Transport: AsyncWrite + Unpin + Send {
    /// Whether bytes written here pass through an encryption layer.
    fn is_encrypted(&self) -> bool {
        false
    }

    /// Writes `length` bytes of `file` starting at `offset` straight to the transport.
    ///
    /// Everything previously written must already be flushed. The default copies the
    /// region through user space in [`CHUNK_SIZE`] pieces.
    async fn send_file_region(&mut self, file: File, offset: u64, length: u64, progress: &mut TransferProgress) -> io::Result<()> {
        let mut chunks = ChunkedFile::open(file, offset, length).await?;
        while let Some(chunk) = chunks.next_chunk().await? {
            self.write_all(&chunk).await?;
            progress.advance(chunk.len() as u64);
        }
        self.flush().await
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl Transport for OwnedWriteHalf {
    async fn send_file_region(&mut self, file: File, offset: u64, length: u64, progress: &mut TransferProgress) -> io::Result<()> {
        zero_copy::send_region(self.as_ref(), &file, offset, length, progress).await
    }
}

#[cfg(not(target_os = "linux"))]
impl Transport for OwnedWriteHalf {}

impl<IO> Transport for WriteHalf<tokio_rustls::server::TlsStream<IO>>
where
    IO: tokio::io::AsyncRead + AsyncWrite + Unpin + Send,
{
    fn is_encrypted(&self) -> bool {
        true
    }
}

impl Transport for DuplexStream {}

impl Transport for WriteHalf<DuplexStream> {}

/// Reads a file region in fixed-size chunks without blocking the calling task.
#[derive(Debug)]
pub(crate) struct ChunkedFile {
    file: tokio::fs::File,
    remaining: u64,
}

impl ChunkedFile {
    pub(crate) async fn open(file: File, offset: u64, length: u64) -> io::Result<Self> {
        let mut file = tokio::fs::File::from_std(file);
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(Self { file, remaining: length })
    }

    /// The next chunk, `None` once the whole region was read.
    ///
    /// A file that ends before the region does is an `UnexpectedEof` error.
    pub(crate) async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let size = usize::try_from(self.remaining).map_or(CHUNK_SIZE, |remaining| remaining.min(CHUNK_SIZE));
        let mut chunk = vec![0u8; size];
        self.file.read_exact(&mut chunk).await?;
        self.remaining -= size as u64;
        Ok(Some(Bytes::from(chunk)))
    }
}

/// Progress of one file transfer. Purely informational.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    total: u64,
    transferred: u64,
}

impl TransferProgress {
    pub fn new(total: u64) -> Self {
        Self { total, transferred: 0 }
    }

    pub fn advance(&mut self, n: u64) {
        self.transferred += n;
        if self.is_complete() {
            debug!(total = self.total, "file transfer complete");
        } else {
            trace!(transferred = self.transferred, total = self.total, "file transfer progress");
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.transferred >= self.total
    }
}

#[cfg(target_os = "linux")]
mod zero_copy {
    use std::fs::File;
    use std::io;
    use std::io::ErrorKind;
    use std::os::fd::AsRawFd;

    use tokio::io::Interest;
    use tokio::net::TcpStream;

    use super::TransferProgress;

    /// Upper bound of a single `sendfile` call, keeps progress reporting regular.
    const MAX_SEND: usize = 1024 * 1024;

    pub(super) async fn send_region(
        stream: &TcpStream,
        file: &File,
        offset: u64,
        length: u64,
        progress: &mut TransferProgress,
    ) -> io::Result<()> {
        let socket_fd = stream.as_raw_fd();
        let file_fd = file.as_raw_fd();
        let mut position =
            libc::off_t::try_from(offset).map_err(|_| io::Error::new(ErrorKind::InvalidInput, "file offset out of range"))?;

        let mut remaining = length;
        while remaining > 0 {
            let count = usize::try_from(remaining).map_or(MAX_SEND, |remaining| remaining.min(MAX_SEND));
            stream.writable().await?;

            let result = stream.try_io(Interest::WRITABLE, || {
                // SAFETY: both descriptors stay open for the whole call, the socket is owned by
                // `stream` and the file by `file`, and `position` is a live `off_t` the kernel
                // advances by the number of bytes sent.
                let sent = unsafe { libc::sendfile(socket_fd, file_fd, &mut position, count) };
                usize::try_from(sent).map_err(|_| io::Error::last_os_error())
            });

            match result {
                Ok(0) => return Err(io::Error::new(ErrorKind::UnexpectedEof, "file ended before the announced length")),
                Ok(sent) => {
                    remaining -= sent as u64;
                    progress.advance(sent as u64);
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
