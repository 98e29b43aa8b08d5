use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use lookout_http::date;
use lookout_http::protocol::{RequestContext, ResponseBody};
use serde::Serialize;
use tracing::{debug, warn};

use super::RequestHandler;
use crate::config::CommandInfo;
use crate::error::RequestError;
use crate::offloader::Offloader;

/// Runs a configured command on every request and reports its output as JSON.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    info: Arc<CommandInfo>,
    offloader: Offloader,
}

#[derive(Debug, Serialize)]
struct CommandResult<'a> {
    command_info: &'a CommandInfo,
    now: String,
    output_lines: Vec<String>,
    exit_value: i32,
}

impl CommandHandler {
    pub fn new(info: CommandInfo, offloader: Offloader) -> Self {
        Self { info: Arc::new(info), offloader }
    }
}

#[async_trait]
impl RequestHandler for CommandHandler {
    async fn invoke(&self, _ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        let info = Arc::clone(&self.info);
        let body = self.offloader.run(move || render(&info)).await?;

        let mut response = Response::new(ResponseBody::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}

fn render(info: &CommandInfo) -> Result<Vec<u8>, RequestError> {
    let result = run(info);
    serde_json::to_vec_pretty(&result).map_err(RequestError::internal)
}

fn run(info: &CommandInfo) -> CommandResult<'_> {
    debug!(command = %info.command, args = ?info.args, "start process");
    let output = Command::new(&info.command).args(&info.args).stdin(Stdio::null()).output();
    let now = date::format(SystemTime::now());

    match output {
        Ok(output) => {
            let exit_value = output.status.code().unwrap_or(-1);
            debug!(command = %info.command, exit_value, "process finished");
            CommandResult { command_info: info, now, output_lines: output_lines(&output), exit_value }
        }
        Err(e) => {
            warn!(command = %info.command, cause = %e, "can't run command");
            CommandResult { command_info: info, now, output_lines: vec![format!("command error {e}")], exit_value: -1 }
        }
    }
}

/// Standard output followed by standard error, line by line.
fn output_lines(output: &Output) -> Vec<String> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout.lines().chain(stderr.lines()).map(str::to_string).collect()
}
