use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Response};
use lookout_http::protocol::{RequestContext, ResponseBody};

use super::RequestHandler;
use crate::conditional;
use crate::error::RequestError;

/// A body rendered once at startup and served from memory.
///
/// Every send builds its own response around the shared bytes, so nothing a connection
/// does to its response leaks into another one.
#[derive(Debug, Clone)]
pub struct StaticPage {
    body: Bytes,
    content_type: HeaderValue,
    last_modified: SystemTime,
}

impl StaticPage {
    pub fn new(body: impl Into<Bytes>, content_type: HeaderValue, last_modified: SystemTime) -> Self {
        Self { body: body.into(), content_type, last_modified }
    }

    pub fn html(body: impl Into<Bytes>, last_modified: SystemTime) -> Self {
        Self::new(body, HeaderValue::from_static("text/html; charset=UTF-8"), last_modified)
    }

    pub fn json(body: impl Into<Bytes>, last_modified: SystemTime) -> Self {
        Self::new(body, HeaderValue::from_static("application/json"), last_modified)
    }

    pub fn respond(&self, ctx: &RequestContext) -> Response<ResponseBody> {
        conditional::respond_cached(ctx.headers(), self.content_type.clone(), self.last_modified, self.body.clone())
    }
}

#[async_trait]
impl RequestHandler for StaticPage {
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        Ok(self.respond(ctx))
    }
}
