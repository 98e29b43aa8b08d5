use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

use crate::protocol::RequestHeader;

/// Everything a handler learns about one request.
///
/// The context owns its copy of the request headers, so it outlives the decode buffer
/// and can be moved onto a blocking worker. It is created once per request and is
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    keep_alive: bool,
    peer: Option<SocketAddr>,
    encrypted: bool,
    request_number: u64,
    started: Instant,
}

impl RequestContext {
    /// Builds a context from a decoded header and its aggregated body.
    ///
    /// Keep-alive intent is resolved here from the version and the `Connection` header.
    pub fn new(header: RequestHeader, body: Bytes) -> Self {
        let keep_alive = header.is_keep_alive();
        let (parts, ()) = header.into_inner().into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            keep_alive,
            peer: None,
            encrypted: false,
            request_number: 1,
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    #[must_use]
    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    #[must_use]
    pub fn with_request_number(mut self, request_number: u64) -> Self {
        self.request_number = request_number;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The client's keep-alive intent, before any response status is considered.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Whether the request arrived over an encrypted transport.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Position of this request on its connection, starting at 1.
    pub fn request_number(&self) -> u64 {
        self.request_number
    }

    /// When the request was handed to the dispatcher.
    pub fn started(&self) -> Instant {
        self.started
    }
}
