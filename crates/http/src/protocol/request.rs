//! Decoded request headers.
//!
//! [`RequestHeader`] wraps an `http::Request<()>` built by the header decoder and adds
//! the connection-level questions the engine has to answer about it.

use http::header::CONNECTION;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// A decoded request line plus header block.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client asked to reuse the connection after this request.
    ///
    /// HTTP/1.1 keeps the connection unless a `Connection: close` token is present,
    /// HTTP/1.0 closes it unless a `Connection: keep-alive` token is present.
    pub fn is_keep_alive(&self) -> bool {
        if self.version() == Version::HTTP_10 {
            has_connection_token(self.headers(), "keep-alive")
        } else {
            !has_connection_token(self.headers(), "close")
        }
    }
}

fn has_connection_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|item| item.trim().eq_ignore_ascii_case(token))
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: Version, connection: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(Method::GET).uri("/").version(version);
        if let Some(value) = connection {
            builder = builder.header(CONNECTION, value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn http11_keeps_alive_by_default() {
        assert!(header(Version::HTTP_11, None).is_keep_alive());
        assert!(header(Version::HTTP_11, Some("keep-alive")).is_keep_alive());
        assert!(!header(Version::HTTP_11, Some("close")).is_keep_alive());
        assert!(!header(Version::HTTP_11, Some("Upgrade, Close")).is_keep_alive());
    }

    #[test]
    fn http10_closes_by_default() {
        assert!(!header(Version::HTTP_10, None).is_keep_alive());
        assert!(header(Version::HTTP_10, Some("Keep-Alive")).is_keep_alive());
        assert!(!header(Version::HTTP_10, Some("close")).is_keep_alive());
    }

    #[test]
    fn from_parts() {
        let (parts, ()) = Request::get("/index.html?a=1").body(()).unwrap().into_parts();
        let header = RequestHeader::from(parts);
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), Some("a=1"));
    }
}
