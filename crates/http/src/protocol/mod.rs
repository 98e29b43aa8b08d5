//! Protocol-level types shared by the codec, the connection loop and handlers.
//!
//! - [`RequestHeader`]: a decoded request line and header block
//! - [`RequestContext`]: everything a handler learns about one request
//! - [`ResponseBody`] and [`FileRegion`]: what a handler hands back for transmission
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the framing vocabulary of the encoder
//! - [`HttpError`], [`ParseError`], [`SendError`]: error types of the engine

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod context;
pub use context::RequestContext;

mod response;
pub use response::error_response;
pub use response::FileRegion;
pub use response::ResponseBody;
pub use response::ResponseHead;
pub(crate) use response::finalize_head;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
