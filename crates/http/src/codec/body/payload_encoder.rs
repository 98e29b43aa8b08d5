use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};

use tokio_util::codec::Encoder;

/// Encodes the payload of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// no payload; only the end marker is accepted
    NoBody { finished: bool },
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody { finished: false } }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::NoBody { finished } => *finished,
        }
    }

    /// Accounts `n` payload bytes written straight to the transport.
    pub fn advance(&mut self, n: u64) -> Result<(), SendError> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.advance(n),
            Kind::NoBody { .. } if n == 0 => Ok(()),
            Kind::NoBody { .. } => Err(SendError::invalid_body("response has no payload")),
        }
    }
}

impl From<PayloadSize> for PayloadEncoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadEncoder::fix_length(size),
            PayloadSize::Empty => PayloadEncoder::empty(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match (&mut self.kind, item) {
            (Kind::Length(encoder), item) => encoder.encode(item, dst),
            (Kind::NoBody { finished }, PayloadItem::Eof) => {
                *finished = true;
                Ok(())
            }
            (Kind::NoBody { .. }, PayloadItem::Chunk(bytes)) if !bytes.has_remaining() => Ok(()),
            (Kind::NoBody { .. }, PayloadItem::Chunk(_)) => Err(SendError::invalid_body("response has no payload")),
        }
    }
}
