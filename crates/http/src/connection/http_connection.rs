use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::{FutureExt, StreamExt};
use http::{Response, StatusCode, Version};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::codec::RequestDecoder;
use crate::connection::lifecycle;
use crate::connection::message_writer::MessageWriter;
use crate::connection::state::ConnectionState;
use crate::connection::transfer::{ChunkedFile, TransferProgress, Transport};
use crate::handler::Handler;
use crate::protocol::{
    error_response, finalize_head, FileRegion, HttpError, Message, PayloadItem, PayloadSize, RequestContext, RequestHeader,
    ResponseBody, ResponseHead, SendError,
};

const READ_BUFFER_SIZE: usize = 8 * 1024;
const WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// One HTTP connection.
///
/// Requests are handled strictly one after another: the next request is not read before
/// the response to the previous one was written. Every decoded request gets exactly one
/// response; a request that fails to decode is answered with a failure status and the
/// connection is closed.
///
/// # Type Parameters
///
/// * `R`: the read half of the connection
/// * `W`: the write half, a [`Transport`]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: MessageWriter<W>,
    state: ConnectionState,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: Transport,
{
    pub fn new(reader: R, writer: W, peer: Option<SocketAddr>) -> Self {
        Self::with_decoder(reader, writer, peer, RequestDecoder::new())
    }

    pub fn with_decoder(reader: R, writer: W, peer: Option<SocketAddr>, decoder: RequestDecoder) -> Self {
        let state = ConnectionState::new(peer, writer.is_encrypted());
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, READ_BUFFER_SIZE),
            writer: MessageWriter::with_capacity(writer, WRITE_BUFFER_SIZE),
            state,
        }
    }

    /// Serves requests until the peer goes away or a response closes the connection.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok((header, body))) => {
                    if !self.do_process(header, body, handler.as_ref()).await? {
                        break;
                    }
                }

                Some(Err(e)) => {
                    if let Some(status) = e.status() {
                        warn!(peer = ?self.state.peer(), cause = %e, "can't decode request");
                        self.send_decode_failure(status).await?;
                    }
                    return Err(e.into());
                }

                None => {
                    debug!(peer = ?self.state.peer(), requests = self.state.requests(), "peer closed the connection");
                    return Ok(());
                }
            }
        }

        self.writer.shutdown().await?;
        debug!(
            peer = ?self.state.peer(),
            requests = self.state.requests(),
            active = ?self.state.active_since().elapsed(),
            "connection closed after response"
        );
        Ok(())
    }

    /// Handles one request, returning whether the connection stays open.
    async fn do_process<H>(&mut self, header: RequestHeader, body: Bytes, handler: &H) -> Result<bool, HttpError>
    where
        H: Handler + ?Sized,
    {
        let request_number = self.state.begin_request();
        let ctx = RequestContext::new(header, body)
            .with_peer(self.state.peer())
            .with_encrypted(self.state.encrypted())
            .with_request_number(request_number);

        let response = match AssertUnwindSafe(handler.call(&ctx)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(uri = %ctx.uri(), cause = %e, "handle request error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(_) => {
                error!(uri = %ctx.uri(), "request handler panicked");
                error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        let status = response.status();
        let length = response.body().len();
        let keep_alive = lifecycle::decide(ctx.keep_alive(), status);

        if let Err(e) = self.send_response(response, ctx.version(), keep_alive).await {
            error!(uri = %ctx.uri(), cause = %e, "can't send response");
            if !self.state.response_sent() {
                self.writer.reset();
                // the connection is closed right after, whether this reaches the peer or not
                if let Err(e) = self.send_response(error_response(StatusCode::INTERNAL_SERVER_ERROR), ctx.version(), false).await {
                    debug!(cause = %e, "can't send failure response");
                }
            }
            return Err(e);
        }

        info!(
            remote = ?ctx.peer(),
            method = %ctx.method(),
            uri = %ctx.uri(),
            version = ?ctx.version(),
            status = status.as_u16(),
            length,
            elapsed = %format!("{:.9}", ctx.started().elapsed().as_secs_f64()),
            "access"
        );

        Ok(keep_alive)
    }

    async fn send_decode_failure(&mut self, status: StatusCode) -> Result<(), HttpError> {
        let response = error_response(status);
        let length = response.body().len();
        self.send_response(response, Version::HTTP_11, false).await?;
        info!(remote = ?self.state.peer(), status = status.as_u16(), length, "access");
        Ok(self.writer.shutdown().await?)
    }

    async fn send_response(&mut self, response: Response<ResponseBody>, version: Version, keep_alive: bool) -> Result<(), HttpError> {
        let (parts, body) = response.into_parts();
        let mut head = ResponseHead::from_parts(parts, ());
        finalize_head(&mut head, version, keep_alive);

        match body {
            ResponseBody::Empty => {
                self.writer.write(Message::<_, Bytes>::Header((head, PayloadSize::Empty)))?;
            }
            ResponseBody::Full(bytes) => {
                self.writer.write(Message::<_, Bytes>::Header((head, PayloadSize::of(bytes.len() as u64))))?;
                self.writer.write(Message::Payload(PayloadItem::Chunk(bytes)))?;
            }
            ResponseBody::File(region) => return self.send_file(head, region).await,
        }

        self.writer.write(Message::<_, Bytes>::Payload(PayloadItem::Eof))?;
        self.flush().await
    }

    /// Sends a file body, zero-copy on a plaintext transport and in encoded chunks on an
    /// encrypted one.
    async fn send_file(&mut self, head: ResponseHead, region: FileRegion) -> Result<(), HttpError> {
        let (file, offset, length) = region.into_parts();
        let mut progress = TransferProgress::new(length);
        self.writer.write(Message::<_, Bytes>::Header((head, PayloadSize::of(length))))?;

        if self.state.encrypted() {
            let mut chunks = ChunkedFile::open(file, offset, length).await.map_err(SendError::io)?;
            while let Some(chunk) = chunks.next_chunk().await.map_err(SendError::io)? {
                let n = chunk.len() as u64;
                self.writer.write(Message::Payload(PayloadItem::Chunk(chunk)))?;
                self.flush().await?;
                progress.advance(n);
            }
        } else {
            self.flush().await?;
            self.writer.get_mut().send_file_region(file, offset, length, &mut progress).await.map_err(SendError::io)?;
            self.writer.skip_payload(length)?;
        }

        self.writer.write(Message::<_, Bytes>::Payload(PayloadItem::Eof))?;
        self.flush().await
    }

    async fn flush(&mut self) -> Result<(), HttpError> {
        if self.writer.has_pending() {
            self.state.mark_response_sent();
        }
        Ok(self.writer.flush().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use std::io::Write;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    type BoxError = crate::handler::BoxError;

    /// Marks a transport as encrypted so the chunked strategy is taken.
    struct Encrypted<W>(W);

    impl<W: AsyncWrite + Unpin> AsyncWrite for Encrypted<W> {
        fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
            Pin::new(&mut self.0).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.0).poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.0).poll_shutdown(cx)
        }
    }

    impl<W: AsyncWrite + Unpin + Send> Transport for Encrypted<W> {
        fn is_encrypted(&self) -> bool {
            true
        }
    }

    fn split_server() -> (DuplexStream, ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) {
        let (client, server) = tokio::io::duplex(256 * 1024);
        let (reader, writer) = tokio::io::split(server);
        (client, reader, writer)
    }

    async fn exchange<H: Handler + 'static>(handler: H, request: &[u8]) -> (String, Result<(), HttpError>) {
        let (mut client, reader, writer) = split_server();
        let connection = HttpConnection::new(reader, writer, None);
        let server = tokio::spawn(connection.process(Arc::new(handler)));

        client.write_all(request).await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = vec![];
        client.read_to_end(&mut response).await.unwrap();
        (String::from_utf8_lossy(&response).into_owned(), server.await.unwrap())
    }

    async fn hello(ctx: RequestContext) -> Result<Response<ResponseBody>, BoxError> {
        Ok(Response::new(ResponseBody::from(format!("hello {}", ctx.uri().path()))))
    }

    #[tokio::test]
    async fn keep_alive_serves_sequential_requests() {
        let (response, result) =
            exchange(make_handler(hello), b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n").await;

        assert!(result.is_ok());
        assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(response.contains("content-length: 8\r\n"));
        assert!(response.contains("\r\n\r\nhello /a"));
        assert!(response.ends_with("\r\n\r\nhello /b"));
        assert!(!response.contains("connection: close"));
        assert!(response.contains("date: "));
    }

    #[tokio::test]
    async fn connection_close_stops_reading() {
        let (response, result) =
            exchange(make_handler(hello), b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await;

        assert!(result.is_ok());
        assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 1);
        assert!(response.contains("connection: close\r\n"));
        assert!(!response.contains("hello /b"));
    }

    #[tokio::test]
    async fn http10_default_close() {
        let (response, _) = exchange(make_handler(hello), b"GET /a HTTP/1.0\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.contains("connection: close\r\n"));
    }

    #[tokio::test]
    async fn http10_keep_alive() {
        let (response, _) = exchange(make_handler(hello), b"GET /a HTTP/1.0\r\nConnection: keep-alive\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.contains("connection: keep-alive\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_is_400_and_closed() {
        let (response, result) = exchange(make_handler(hello), b"GARBAGE\x01 / HTTP/1.1\r\n\r\nGET /a HTTP/1.1\r\n\r\n").await;

        assert!(result.is_err());
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("connection: close\r\n"));
        assert!(response.contains("content-type: text/plain; charset=UTF-8\r\n"));
        assert!(response.ends_with("\r\n\r\nFailure: 400 Bad Request\r\n"));
        assert!(!response.contains("hello"));
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let (response, result) = exchange(make_handler(hello), b"POST /a HTTP/1.1\r\nContent-Length: 70000\r\n\r\n").await;

        assert!(result.is_err());
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.contains("connection: close\r\n"));
    }

    #[tokio::test]
    async fn handler_error_is_500_and_closed() {
        let handler = make_handler(|_ctx: RequestContext| async { Err::<Response<ResponseBody>, BoxError>("boom".into()) });
        let (response, _) = exchange(handler, b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await;

        assert_eq!(response.matches("HTTP/1.1 500 Internal Server Error\r\n").count(), 1);
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("Failure: 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn handler_panic_is_500() {
        let handler = make_handler(|ctx: RequestContext| async move {
            assert!(ctx.uri().path() != "/panic", "handler blew up");
            Ok::<_, BoxError>(Response::new(ResponseBody::empty()))
        });
        let (response, _) = exchange(handler, b"GET /panic HTTP/1.1\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn request_numbers_increase() {
        let handler = make_handler(|ctx: RequestContext| async move {
            Ok::<_, BoxError>(Response::new(ResponseBody::from(ctx.request_number().to_string())))
        });
        let (response, _) = exchange(handler, b"GET /a HTTP/1.1\r\n\r\nGET /a HTTP/1.1\r\n\r\nGET /a HTTP/1.1\r\n\r\n").await;

        assert!(response.ends_with("\r\n\r\n3"));
    }

    fn file_body(content: &[u8]) -> FileRegion {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(content).unwrap();
        FileRegion::new(file, content.len() as u64)
    }

    fn content() -> Vec<u8> {
        (0..20_000u32).map(|i| (i % 251) as u8).collect()
    }

    fn body_of(response: &[u8]) -> &[u8] {
        let end = response.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        &response[end + 4..]
    }

    #[tokio::test]
    async fn file_body_plaintext() {
        let handler = make_handler(|_ctx: RequestContext| async {
            Ok::<_, BoxError>(Response::new(ResponseBody::from(file_body(&content()))))
        });

        let (mut client, reader, writer) = split_server();
        let server = tokio::spawn(HttpConnection::new(reader, writer, None).process(Arc::new(handler)));
        client.write_all(b"GET /f HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();

        let mut response = vec![];
        client.read_to_end(&mut response).await.unwrap();
        server.await.unwrap().unwrap();

        assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert!(String::from_utf8_lossy(&response).contains("content-length: 20000\r\n"));
        assert_eq!(body_of(&response), content().as_slice());
    }

    #[tokio::test]
    async fn file_body_encrypted() {
        let handler = make_handler(|ctx: RequestContext| async move {
            assert!(ctx.encrypted());
            Ok::<_, BoxError>(Response::new(ResponseBody::from(file_body(&content()))))
        });

        let (mut client, reader, writer) = split_server();
        let server = tokio::spawn(HttpConnection::new(reader, Encrypted(writer), None).process(Arc::new(handler)));
        client.write_all(b"GET /f HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();

        let mut response = vec![];
        client.read_to_end(&mut response).await.unwrap();
        server.await.unwrap().unwrap();

        assert!(String::from_utf8_lossy(&response).contains("content-length: 20000\r\n"));
        assert_eq!(body_of(&response), content().as_slice());
    }

    #[tokio::test]
    async fn short_file_before_first_byte_is_500() {
        let handler = make_handler(|_ctx: RequestContext| async {
            let mut file = tempfile::tempfile().unwrap();
            file.write_all(b"tiny").unwrap();
            Ok::<_, BoxError>(Response::new(ResponseBody::from(FileRegion::new(file, 100))))
        });

        let (mut client, reader, writer) = split_server();
        let server = tokio::spawn(HttpConnection::new(reader, Encrypted(writer), None).process(Arc::new(handler)));
        client.write_all(b"GET /f HTTP/1.1\r\n\r\n").await.unwrap();

        let mut response = vec![];
        client.read_to_end(&mut response).await.unwrap();

        assert!(server.await.unwrap().is_err());
        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(!response.contains("content-length: 100"));
    }
}
