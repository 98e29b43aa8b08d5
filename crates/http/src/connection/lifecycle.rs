//! Connection lifecycle policy.
//!
//! A response keeps its connection open only when the client asked for it and the status
//! does not signal that the framing or the server state can no longer be trusted.

use http::StatusCode;

/// Statuses after which the connection is always closed.
const CLOSING_STATUSES: [StatusCode; 8] = [
    StatusCode::BAD_REQUEST,
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::LENGTH_REQUIRED,
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::URI_TOO_LONG,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::NOT_IMPLEMENTED,
];

/// Whether `status` forces the connection closed.
pub fn drops_connection(status: StatusCode) -> bool {
    CLOSING_STATUSES.contains(&status)
}

/// Final keep-alive decision for a response with `status` to a request whose own
/// keep-alive intent is `request_keep_alive`.
pub fn decide(request_keep_alive: bool, status: StatusCode) -> bool {
    request_keep_alive && !drops_connection(status)
}
