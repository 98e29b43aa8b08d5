use std::time::{Instant, SystemTime};

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use lookout_http::date;
use lookout_http::protocol::{RequestContext, ResponseBody};
use serde::Serialize;
use tokio::runtime::Handle;

use super::RequestHandler;
use crate::error::RequestError;

/// Live statistics of the runtime serving the request.
#[derive(Debug)]
pub struct RuntimeHandler {
    started: Instant,
}

#[derive(Debug, Serialize)]
struct RuntimeStats {
    now: String,
    uptime_seconds: u64,
    workers: usize,
    alive_tasks: usize,
    global_queue_depth: usize,
}

impl RuntimeHandler {
    pub fn new(started: Instant) -> Self {
        Self { started }
    }
}

#[async_trait]
impl RequestHandler for RuntimeHandler {
    async fn invoke(&self, _ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        let metrics = Handle::try_current().map_err(RequestError::internal)?.metrics();
        let stats = RuntimeStats {
            now: date::format(SystemTime::now()),
            uptime_seconds: self.started.elapsed().as_secs(),
            workers: metrics.num_workers(),
            alive_tasks: metrics.num_alive_tasks(),
            global_queue_depth: metrics.global_queue_depth(),
        };

        let body = serde_json::to_vec_pretty(&stats).map_err(RequestError::internal)?;
        let mut response = Response::new(ResponseBody::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}
