//! Runs blocking work away from the I/O threads.
//!
//! Backed by tokio's blocking pool, which grows on demand and reuses idle threads. A
//! task that fails or panics is answered with a 500 so the waiting connection always
//! gets a response.

use http::Response;
use lookout_http::protocol::ResponseBody;
use tokio::runtime::Handle;
use tracing::error;

use crate::error::RequestError;

#[derive(Debug, Clone)]
pub struct Offloader {
    handle: Handle,
}

impl Offloader {
    /// An offloader on the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runs `task` on the blocking pool and waits for its response.
    pub async fn submit<F>(&self, task: F) -> Response<ResponseBody>
    where
        F: FnOnce() -> Result<Response<ResponseBody>, RequestError> + Send + 'static,
    {
        match self.run(task).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }

    /// Runs `task` on the blocking pool, turning a panic into [`RequestError::Internal`].
    pub async fn run<F, T>(&self, task: F) -> Result<T, RequestError>
    where
        F: FnOnce() -> Result<T, RequestError> + Send + 'static,
        T: Send + 'static,
    {
        match self.handle.spawn_blocking(task).await {
            Ok(result) => result,
            Err(e) => {
                error!(cause = %e, "offloaded task did not complete");
                Err(RequestError::internal(e))
            }
        }
    }
}
