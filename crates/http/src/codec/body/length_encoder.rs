use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Accounts payload bytes against an announced `Content-Length`.
///
/// Writing more than announced, or ending the payload early, is an error: the peer
/// would otherwise misread the framing of the next response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    finished: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, finished: false }
    }

    pub fn is_finish(&self) -> bool {
        self.finished
    }

    /// Accounts `n` bytes that were written to the transport without passing
    /// through the encoder.
    pub fn advance(&mut self, n: u64) -> Result<(), SendError> {
        if n > self.remaining {
            return Err(SendError::invalid_body(format!("{n} bytes exceed the remaining content length {}", self.remaining)));
        }
        self.remaining -= n;
        Ok(())
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                self.advance(bytes.remaining() as u64)?;
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(len);
                }
                Ok(())
            }
            PayloadItem::Eof => {
                if self.remaining != 0 {
                    return Err(SendError::invalid_body(format!("payload ended with {} bytes missing", self.remaining)));
                }
                self.finished = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn exact_length() {
        let mut encoder = LengthEncoder::new(10);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"01234")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"56789")), &mut dst).unwrap();
        assert!(!encoder.is_finish());
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert!(encoder.is_finish());
        assert_eq!(&dst[..], b"0123456789");
    }

    #[test]
    fn overflow_is_error() {
        let mut encoder = LengthEncoder::new(3);
        let mut dst = BytesMut::new();
        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"0123")), &mut dst).is_err());
    }

    #[test]
    fn early_eof_is_error() {
        let mut encoder = LengthEncoder::new(3);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"01")), &mut dst).unwrap();
        assert!(encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).is_err());
    }

    #[test]
    fn advance_bypassed_bytes() {
        let mut encoder = LengthEncoder::new(8);
        let mut dst = BytesMut::new();
        encoder.advance(8).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert!(encoder.is_finish());
        assert!(dst.is_empty());
        assert!(LengthEncoder::new(1).advance(2).is_err());
    }
}
