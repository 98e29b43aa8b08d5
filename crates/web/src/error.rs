//! Error types of the application.
//!
//! [`RequestError`] is the failure taxonomy of a single request; every variant maps to
//! exactly one status and is turned into a plain-text failure response at the boundary
//! that observes it. [`ServerError`] covers everything that can stop the server from
//! starting.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use http::header::ALLOW;
use http::{HeaderValue, Method, Response, StatusCode};
use lookout_http::handler::BoxError;
use lookout_http::protocol::{error_response, ResponseBody};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::ConfigError;
use crate::router::RouterBuildError;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("method {method} not allowed")]
    MethodNotAllowed { method: Method },

    #[error("{path} not found")]
    NotFound { path: String },

    #[error("{path} is forbidden")]
    Forbidden { path: String },

    #[error("internal error: {source}")]
    Internal { source: BoxError },
}

impl RequestError {
    pub fn method_not_allowed(method: &Method) -> Self {
        Self::MethodNotAllowed { method: method.clone() }
    }

    pub fn not_found<S: ToString>(path: S) -> Self {
        Self::NotFound { path: path.to_string() }
    }

    pub fn forbidden<S: ToString>(path: S) -> Self {
        Self::Forbidden { path: path.to_string() }
    }

    pub fn internal<E: Into<BoxError>>(e: E) -> Self {
        Self::Internal { source: e.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The failure response for this error. Internal errors are logged as errors,
    /// everything else is an ordinary client mistake.
    pub fn into_response(self) -> Response<ResponseBody> {
        let status = self.status();
        if let Self::Internal { source } = &self {
            error!(cause = %source, "request failed");
        } else {
            debug!(status = status.as_u16(), cause = %self, "request rejected");
        }

        let mut response = error_response(status);
        if let Self::MethodNotAllowed { .. } = self {
            response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET"));
        }
        response
    }
}

impl From<io::Error> for RequestError {
    fn from(e: io::Error) -> Self {
        Self::internal(e)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("route error: {source}")]
    Router {
        #[from]
        source: RouterBuildError,
    },

    #[error("server build error: {source}")]
    Build {
        #[from]
        source: crate::server::ServerBuildError,
    },

    #[error("can't load resource {}: {source}", path.display())]
    Resource { path: PathBuf, source: io::Error },

    #[error("invalid tls setup: {reason}")]
    Tls { reason: String },

    #[error("can't render {what}: {source}")]
    Render { what: &'static str, source: serde_json::Error },

    #[error("can't render {what}: {source}")]
    Template { what: &'static str, source: tera::Error },

    #[error("can't bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServerError {
    pub fn resource<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::Resource { path: path.into(), source }
    }

    pub fn tls<S: ToString>(reason: S) -> Self {
        Self::Tls { reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(response: &Response<ResponseBody>) -> &[u8] {
        match response.body() {
            ResponseBody::Full(bytes) => bytes.as_ref(),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn statuses() {
        assert_eq!(RequestError::method_not_allowed(&Method::POST).status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(RequestError::not_found("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(RequestError::forbidden("/dir").status(), StatusCode::FORBIDDEN);
        assert_eq!(RequestError::internal("boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_body() {
        let response = RequestError::not_found("/no/such/path").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response), b"Failure: 404 Not Found\r\n");
    }

    #[test]
    fn method_not_allowed_advertises_get() {
        let response = RequestError::method_not_allowed(&Method::POST).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
        assert_eq!(body(&response), b"Failure: 405 Method Not Allowed\r\n");
    }

    #[test]
    fn io_error_is_internal() {
        let e = RequestError::from(io::Error::other("disk on fire"));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
