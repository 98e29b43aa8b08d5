//! The handler the connection loop invokes for every decoded request.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;
use http::Response;

use crate::protocol::{RequestContext, ResponseBody};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Produces the response for one request.
///
/// An `Err` (or a panic) is answered with a 500 by the connection loop.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, BoxError>;
}

/// A [`Handler`] backed by an async function, see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Err> Handler for HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<ResponseBody>, Err>> + Send,
    Err: Into<BoxError>,
{
    async fn call(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, BoxError> {
        (self.f)(ctx.clone()).await.map_err(Into::into)
    }
}

/// Wraps an async function taking an owned [`RequestContext`] into a [`Handler`].
pub fn make_handler<F, Fut, Err>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut,
    Fut: Future<Output = Result<Response<ResponseBody>, Err>>,
    Err: Into<BoxError>,
{
    HandlerFn { f }
}
