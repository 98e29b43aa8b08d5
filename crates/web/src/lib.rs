//! The lookout server: static files, pre-rendered pages and a few diagnostic endpoints
//! on top of [`lookout_http`].
//!
//! A [`Config`] is turned into a [`Router`] once at startup; the [`Dispatcher`] resolves
//! every request against it and the matched [`RequestHandler`] produces the response.
//! Filesystem and process work runs on the [`Offloader`], never on an I/O thread.
//!
//! ```no_run
//! use lookout_web::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.json")?;
//!     Server::from_config(&config)?.start().await?;
//!     Ok(())
//! }
//! ```

pub mod conditional;
pub mod config;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod handler;
pub mod offloader;
pub mod pages;
pub mod router;
pub mod routes;
pub mod server;
pub mod tls;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use environment::Environment;
pub use error::{RequestError, ServerError};
pub use handler::{handler_fn, FnHandler, RequestHandler};
pub use offloader::Offloader;
pub use router::Router;
pub use server::Server;
