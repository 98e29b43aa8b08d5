//! Server configuration.
//!
//! Loaded once at startup from a JSON file and then passed by reference to whatever
//! needs it.
//!
//! ```json
//! {
//!   "server_info": { "listen_address": "127.0.0.1", "listen_port": 8080, "tcp_no_delay": true },
//!   "main_page_info": { "title": "lookout" },
//!   "static_file_info": [
//!     { "url": "/static/logo.png", "file_path": "static/logo.png", "embedded": false,
//!       "content_type": "image/png", "include_in_main_page": true }
//!   ],
//!   "command_info": [
//!     { "id": "uptime", "description": "uptime", "command": "uptime", "args": [] }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use http::HeaderValue;
use mime::Mime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub server_info: ServerInfo,
    pub main_page_info: MainPageInfo,
    #[serde(default)]
    pub static_file_info: Vec<StaticFileInfo>,
    #[serde(default)]
    pub command_info: Vec<CommandInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub listen_address: String,
    pub listen_port: u16,
    #[serde(default)]
    pub tcp_no_delay: bool,
    /// Number of I/O worker threads, defaults to the number of cores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsInfo {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainPageInfo {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFileInfo {
    pub url: String,
    pub file_path: PathBuf,
    /// Load the file once at startup and serve it from memory.
    #[serde(default, alias = "classpath")]
    pub embedded: bool,
    pub content_type: String,
    #[serde(default)]
    pub include_in_main_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub id: String,
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("can't parse configuration: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },

    #[error("can't resolve listen address {address}")]
    Address { address: String },
}

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything serde can't, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = vec![];

        if self.server_info.io_threads == Some(0) {
            problems.push("server_info.io_threads must be positive".to_string());
        }

        for info in &self.static_file_info {
            if !info.url.starts_with('/') {
                problems.push(format!("static file url {:?} must start with '/'", info.url));
            }
            if info.content_type.parse::<Mime>().is_err() || HeaderValue::from_str(&info.content_type).is_err() {
                problems.push(format!("content type {:?} of {} is not a valid media type", info.content_type, info.url));
            }
        }

        let mut ids = HashSet::new();
        for info in &self.command_info {
            if info.id.is_empty() || info.id.contains('/') {
                problems.push(format!("command id {:?} must be non-empty and contain no '/'", info.id));
            } else if !ids.insert(info.id.as_str()) {
                problems.push(format!("command id {:?} is used more than once", info.id));
            }
            if info.command.is_empty() {
                problems.push(format!("command {:?} has an empty command line", info.id));
            }
        }

        if problems.is_empty() { Ok(()) } else { Err(ConfigError::Invalid { problems }) }
    }

    /// The address the server listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ServerInfo { listen_address, listen_port, .. } = &self.server_info;
        (listen_address.as_str(), *listen_port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addresses| addresses.next())
            .ok_or_else(|| ConfigError::Address { address: format!("{listen_address}:{listen_port}") })
    }
}
