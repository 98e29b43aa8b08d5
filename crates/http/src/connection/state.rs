use std::net::SocketAddr;
use std::time::Instant;

/// State carried by one connection across its requests.
///
/// Owned by the connection loop and never shared with another task.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    peer: Option<SocketAddr>,
    encrypted: bool,
    active_since: Instant,
    requests: u64,
    response_sent: bool,
}

impl ConnectionState {
    pub fn new(peer: Option<SocketAddr>, encrypted: bool) -> Self {
        Self { peer, encrypted, active_since: Instant::now(), requests: 0, response_sent: false }
    }

    /// Starts a new request and returns its position on the connection, starting at 1.
    pub fn begin_request(&mut self) -> u64 {
        self.requests += 1;
        self.response_sent = false;
        self.requests
    }

    /// Records that bytes of the current response reached the transport.
    pub fn mark_response_sent(&mut self) {
        self.response_sent = true;
    }

    /// Whether bytes of the current response already reached the transport, in which
    /// case a later failure can only close the connection.
    pub fn response_sent(&self) -> bool {
        self.response_sent
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn active_since(&self) -> Instant {
        self.active_since
    }
}
