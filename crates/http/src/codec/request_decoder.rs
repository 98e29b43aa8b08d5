//! Request decoder.
//!
//! [`RequestDecoder`] yields one complete request at a time: the decoded header block
//! together with its aggregated body. Bodies are framed by `Content-Length` only and are
//! bounded by [`MAX_CONTENT_LENGTH`].

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Largest request body the decoder aggregates.
pub const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

/// Decodes a request header block and then waits for its whole body.
///
/// # State Machine
///
/// - `pending` is `None`: parsing the header block
/// - `pending` is `Some`: the header is decoded and the body is still arriving
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    pending: Option<(RequestHeader, usize)>,
    max_content_length: u64,
}

impl RequestDecoder {
    /// Creates a decoder that accepts bodies up to [`MAX_CONTENT_LENGTH`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that accepts bodies up to `max_content_length` bytes.
    pub fn with_max_content_length(max_content_length: u64) -> Self {
        Self { header_decoder: HeaderDecoder, pending: None, max_content_length }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_max_content_length(MAX_CONTENT_LENGTH)
    }
}

impl Decoder for RequestDecoder {
    type Item = (RequestHeader, Bytes);
    type Error = ParseError;

    /// # Returns
    ///
    /// - `Ok(Some((header, body)))`: a complete request
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request can't be decoded; the connection should not be read further
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            let length = payload_size.len();
            ensure!(length <= self.max_content_length, ParseError::too_large_body(length, self.max_content_length));

            if let PayloadSize::Empty = payload_size {
                return Ok(Some((header, Bytes::new())));
            }

            let length = usize::try_from(length).map_err(|_| ParseError::too_large_body(length, self.max_content_length))?;
            self.pending = Some((header, length));
        }

        let Some((_, length)) = &self.pending else {
            return Ok(None);
        };
        let length = *length;

        if src.len() < length {
            trace!(received = src.len(), expected = length, "waiting for request body");
            src.reserve(length - src.len());
            return Ok(None);
        }

        let body = src.split_to(length).freeze();
        Ok(self.pending.take().map(|(header, _)| (header, body)))
    }
}
