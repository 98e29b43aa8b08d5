//! Response payload encoding.
//!
//! Responses are always `Content-Length` framed, so the only encoders are the
//! [`PayloadEncoder`] for a known length and its empty variant.

mod length_encoder;
mod payload_encoder;

pub use payload_encoder::PayloadEncoder;
