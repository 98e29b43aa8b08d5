//! The HTTP/1.1 engine behind the lookout server
//!
//! This crate owns everything between the socket and a request handler: decoding
//! requests, finalizing and encoding responses, deciding whether a connection
//! survives a response, and pushing file bodies to the peer.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Response, StatusCode};
//! use lookout_http::connection::HttpConnection;
//! use lookout_http::handler::make_handler;
//! use lookout_http::protocol::{RequestContext, ResponseBody};
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer, Some(remote_addr));
//!             if let Err(e) = connection.process(handler).await {
//!                 error!(cause = %e, "connection shutdown");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(ctx: RequestContext) -> Result<Response<ResponseBody>, Box<dyn Error + Send + Sync>> {
//!     info!(path = ctx.uri().path(), "hello");
//!     Ok(Response::builder().status(StatusCode::OK).body(Bytes::from_static(b"Hello World!\r\n").into())?)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: the per-connection loop, lifecycle policy and file transfer strategies
//! - [`protocol`]: request context, response body, error types
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the handler trait the connection loop invokes
//! - [`date`]: the wire date format
//!
//! # Limits
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//! - Maximum request body: 64KB, framed by `Content-Length` only

pub mod codec;
pub mod connection;
pub mod date;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
