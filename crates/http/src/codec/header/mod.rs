//! Header block decoding and encoding.
//!
//! - [`HeaderDecoder`]: parses a request line and header block with `httparse`,
//!   enforcing the header count and size limits
//! - [`HeaderEncoder`]: writes a status line and header block, setting
//!   `Content-Length` from the payload framing

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
