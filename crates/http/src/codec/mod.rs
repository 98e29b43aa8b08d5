//! Request decoding and response encoding.
//!
//! - [`RequestDecoder`]: decodes a header block through [`header`] and aggregates the
//!   `Content-Length` framed body that follows it, yielding one complete request at a time
//! - [`ResponseEncoder`]: encodes a response head and then accounts every payload byte
//!   against the announced `Content-Length`
//!
//! ```
//! use bytes::BytesMut;
//! use lookout_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//! let (header, body) = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(header.uri().path(), "/");
//! assert!(body.is_empty());
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::MAX_CONTENT_LENGTH;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
