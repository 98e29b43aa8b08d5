//! Composes the route table from the configuration.
//!
//! Everything that can be rendered ahead of time is rendered here, once, with the
//! process start time as its modification time.

use std::time::Instant;

use http::HeaderValue;
use serde::Serialize;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::environment::Environment;
use crate::error::ServerError;
use crate::handler::{CommandHandler, RuntimeHandler, StaticFileHandler, StaticPage};
use crate::offloader::Offloader;
use crate::pages::Pages;
use crate::router::Router;

pub fn build_router(config: &Config, environment: &Environment, offloader: &Offloader) -> Result<Router, ServerError> {
    let started_at = environment.started_at;
    let pages = Pages::new()?;
    let mut builder = Router::builder().route("/", StaticPage::html(pages.index(config)?, started_at));

    for info in &config.static_file_info {
        let content_type = HeaderValue::from_str(&info.content_type).map_err(|_| ConfigError::Invalid {
            problems: vec![format!("content type {:?} of {} is not a valid header value", info.content_type, info.url)],
        })?;

        let handler = if info.embedded {
            StaticFileHandler::embedded(&info.url, &info.file_path, content_type, started_at)?
        } else {
            StaticFileHandler::filesystem(&info.url, &info.file_path, content_type, offloader.clone())
        };
        debug!(url = %info.url, path = %info.file_path.display(), embedded = info.embedded, "static resource");
        builder = builder.route(info.url.clone(), handler);
    }

    for info in &config.command_info {
        builder = builder
            .route(format!("/command/{}", info.id), StaticPage::html(pages.command(info)?, started_at))
            .route(format!("/api/command/{}", info.id), CommandHandler::new(info.clone(), offloader.clone()));
    }

    let config_json = render_json("configuration", config)?;
    let environment_json = render_json("environment", environment)?;

    let router = builder
        .route("/debug/config", StaticPage::html(pages.json_document("Configuration", &config_json)?, started_at))
        .route("/api/debug/config", StaticPage::json(config_json, started_at))
        .route("/debug/environment", StaticPage::html(pages.json_document("Environment", &environment_json)?, started_at))
        .route("/api/debug/environment", StaticPage::json(environment_json, started_at))
        .route("/api/debug/runtime", RuntimeHandler::new(Instant::now()))
        .build()?;

    debug!(routes = ?router.paths(), "routes ready");
    Ok(router)
}

fn render_json<T: Serialize>(what: &'static str, value: &T) -> Result<String, ServerError> {
    serde_json::to_string_pretty(value).map_err(|source| ServerError::Render { what, source })
}
