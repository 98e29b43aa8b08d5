//! Per-connection processing.
//!
//! - [`HttpConnection`]: reads one request at a time, invokes the handler, finalizes and
//!   writes its response, and closes the connection when the lifecycle policy says so
//! - [`lifecycle`]: the keep-alive decision taken for every response
//! - [`ConnectionState`]: the state one connection carries across its requests
//! - [`Transport`]: the write side of a connection and how it moves file bytes

mod http_connection;
pub mod lifecycle;
mod message_writer;
mod state;
mod transfer;

pub use http_connection::HttpConnection;
pub use state::ConnectionState;
pub use transfer::{Transport, TransferProgress, CHUNK_SIZE};
