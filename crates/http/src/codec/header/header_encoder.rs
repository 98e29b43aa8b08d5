//! Response header encoding.
//!
//! Serializes the status line and header block of a [`ResponseHead`]. The
//! `Content-Length` header always comes from the payload framing, overriding whatever
//! the handler put there, so the head and the bytes that follow cannot disagree.

use crate::protocol::{PayloadSize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{header, HeaderValue, Version};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encodes a [`ResponseHead`] and its [`PayloadSize`] into raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// # Errors
    ///
    /// Returns error if the head carries a version other than HTTP/1.0 or HTTP/1.1.
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let version = match header.version() {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };
        write!(
            FastWrite(dst),
            "{} {} {}\r\n",
            version,
            header.status().as_str(),
            header.status().canonical_reason().unwrap_or("")
        )?;

        match payload_size {
            PayloadSize::Length(n) => {
                header.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Empty => {
                const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                header.headers_mut().insert(header::CONTENT_LENGTH, ZERO_VALUE);
            }
        }
        header.headers_mut().remove(header::TRANSFER_ENCODING);

        for (header_name, header_value) in header.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut` that has already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
