//! The entry point of every decoded request.
//!
//! Rejects anything but `GET`, resolves the route and invokes its handler.
//! Every [`RequestError`] becomes exactly one failure response here; the
//! connection loop answers panics and decode failures itself.

use async_trait::async_trait;
use http::{Method, Response};
use lookout_http::handler::{BoxError, Handler};
use lookout_http::protocol::{RequestContext, ResponseBody};
use tracing::trace;

use crate::error::RequestError;
use crate::router::Router;

#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    async fn dispatch(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        if ctx.method() != Method::GET {
            return Err(RequestError::method_not_allowed(ctx.method()));
        }

        // every route is a path, so `*` and friends simply miss
        let path = ctx.uri().path();
        let handler = self.router.at(path).ok_or_else(|| RequestError::not_found(path))?;
        trace!(path, request_number = ctx.request_number(), "dispatching");
        handler.invoke(ctx).await
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn call(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, BoxError> {
        Ok(self.dispatch(ctx).await.unwrap_or_else(RequestError::into_response))
    }
}
