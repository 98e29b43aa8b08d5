//! Conditional GET.
//!
//! A resource is "not modified" only when the client's `If-Modified-Since` names the
//! exact second the resource was last modified. A newer or older timestamp gets the
//! full body, as does a validator that doesn't parse.

use std::time::SystemTime;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, DATE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use lookout_http::date;
use lookout_http::protocol::ResponseBody;
use tracing::debug;

pub const CACHE_CONTROL_VALUE: &str = "private, max-age=60";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    NotModified,
    Proceed,
}

pub fn evaluate(last_modified: SystemTime, if_modified_since: Option<&HeaderValue>) -> CacheDecision {
    let Some(value) = if_modified_since else {
        return CacheDecision::Proceed;
    };

    let since = match value.to_str().ok().and_then(date::parse) {
        Some(since) => since,
        None => {
            debug!(value = ?value, "ignoring unparsable If-Modified-Since");
            return CacheDecision::Proceed;
        }
    };

    if date::same_second(since, last_modified) { CacheDecision::NotModified } else { CacheDecision::Proceed }
}

/// Evaluates the `If-Modified-Since` header of `headers`.
pub fn evaluate_headers(last_modified: SystemTime, headers: &HeaderMap) -> CacheDecision {
    evaluate(last_modified, headers.get(IF_MODIFIED_SINCE))
}

/// A 304 with nothing but a `Date`.
pub fn not_modified() -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    response.headers_mut().insert(DATE, date::now());
    response
}

/// A 200 carrying the caching headers every cacheable resource gets.
pub fn cacheable_response(
    content_type: HeaderValue,
    last_modified: SystemTime,
    body: ResponseBody,
) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(LAST_MODIFIED, date::header_value(last_modified));
    headers.insert(DATE, date::now());
    response
}

/// Answers with `body` unless the client already holds this second's version.
pub fn respond_cached(
    headers: &HeaderMap,
    content_type: HeaderValue,
    last_modified: SystemTime,
    body: Bytes,
) -> Response<ResponseBody> {
    match evaluate_headers(last_modified, headers) {
        CacheDecision::NotModified => not_modified(),
        CacheDecision::Proceed => cacheable_response(content_type, last_modified, body.into()),
    }
}
