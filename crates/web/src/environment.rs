//! A snapshot of the process environment taken at startup.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::Serialize;

/// What the server knew about its own process when it started.
///
/// `started_at` doubles as the `Last-Modified` time of everything rendered at startup.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub start_time: String,
    #[serde(skip)]
    pub started_at: SystemTime,
    pub pid: u32,
    pub version: &'static str,
    pub current_dir: Option<String>,
    pub arguments: Vec<String>,
    pub environment_variables: BTreeMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        let started_at = SystemTime::now();
        Self {
            start_time: lookout_http::date::format(started_at),
            started_at,
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION"),
            current_dir: std::env::current_dir().ok().map(|dir| dir.to_string_lossy().into_owned()),
            arguments: std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()).collect(),
            environment_variables: std::env::vars_os()
                .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_current_process() {
        let env = Environment::capture();
        assert_eq!(env.pid, std::process::id());
        assert!(!env.arguments.is_empty());
        assert!(env.start_time.ends_with(" GMT"));

        let json = serde_json::to_value(&env).unwrap();
        assert!(json.get("started_at").is_none());
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
