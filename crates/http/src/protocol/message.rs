use bytes::{Buf, Bytes};

/// A unit handed to the response encoder: either the head or a piece of payload.
///
/// The generic parameter `T` is the head type, `Data` the payload buffer type.
pub enum Message<T, Data: Buf = Bytes> {
    /// Contains the header information of type `T`
    Header(T),
    /// Contains a chunk of payload data or EOF marker
    Payload(PayloadItem<Data>),
}

/// An item of a message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

/// Framing of a message payload.
///
/// Only `Content-Length` framing exists: request bodies are never chunked and
/// response lengths are always known before the head is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Framing for a payload of `length` bytes.
    #[inline]
    pub fn of(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// Number of payload bytes announced by this framing.
    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            PayloadSize::Length(length) => *length,
            PayloadSize::Empty => 0,
        }
    }
}

impl<T> Message<T> {
    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_size_of() {
        assert_eq!(PayloadSize::of(0), PayloadSize::Empty);
        assert_eq!(PayloadSize::of(10), PayloadSize::Length(10));
        assert_eq!(PayloadSize::of(10).len(), 10);
        assert_eq!(PayloadSize::Empty.len(), 0);
    }
}
