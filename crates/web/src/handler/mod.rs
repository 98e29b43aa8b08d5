//! Request handlers the router resolves to.
//!
//! Every route ends in a [`RequestHandler`]. Handlers return the response to send or a
//! [`RequestError`] that the dispatcher turns into a failure response.

mod command;
mod debug;
mod page;
mod static_file;

pub use command::CommandHandler;
pub use debug::RuntimeHandler;
pub use page::StaticPage;
pub use static_file::{serve_file, ResourceSource, StaticFileHandler};

use std::future::Future;

use async_trait::async_trait;
use http::Response;
use lookout_http::protocol::{RequestContext, ResponseBody};

use crate::error::RequestError;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Box<T> {
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        (**self).invoke(ctx).await
    }
}

/// An async function used as a [`RequestHandler`], see [`handler_fn`].
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<ResponseBody>, RequestError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<ResponseBody>, RequestError>> + Send,
{
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        (self.f)(ctx.clone()).await
    }
}
