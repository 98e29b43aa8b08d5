//! The route table.
//!
//! Exact path to handler, built once at startup and read-only afterwards. There are no
//! path parameters or wildcards; the query string never takes part in a lookup.

use std::collections::HashMap;

use thiserror::Error;

use crate::handler::RequestHandler;

pub struct Router {
    routes: HashMap<String, Box<dyn RequestHandler>>,
}

#[derive(Debug, Error)]
pub enum RouterBuildError {
    #[error("route {path} is registered more than once")]
    DuplicateRoute { path: String },

    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The handler registered for exactly `path`.
    pub fn at(&self, path: &str) -> Option<&dyn RequestHandler> {
        self.routes.get(path).map(|handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered paths in lexical order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = self.routes.keys().map(String::as_str).collect::<Vec<_>>();
        paths.sort_unstable();
        paths
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("paths", &self.paths()).finish()
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<(String, Box<dyn RequestHandler>)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, handler: impl RequestHandler + 'static) -> Self {
        self.routes.push((path.into(), Box::new(handler)));
        self
    }

    pub fn build(self) -> Result<Router, RouterBuildError> {
        let mut routes = HashMap::with_capacity(self.routes.len());

        for (path, handler) in self.routes {
            check_path(&path)?;
            if routes.contains_key(&path) {
                return Err(RouterBuildError::DuplicateRoute { path });
            }
            routes.insert(path, handler);
        }

        Ok(Router { routes })
    }
}

fn check_path(path: &str) -> Result<(), RouterBuildError> {
    let reason = if !path.starts_with('/') {
        "must start with '/'"
    } else if path.contains(['?', '#']) {
        "must not contain a query or fragment"
    } else if path.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };

    Err(RouterBuildError::InvalidPath { path: path.to_string(), reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::handler::test_support::{full_body, get};
    use bytes::Bytes;
    use http::Response;
    use lookout_http::protocol::RequestContext;

    fn reply(text: &'static str) -> impl RequestHandler {
        handler_fn(move |_ctx: RequestContext| async move { Ok(Response::new(Bytes::from_static(text.as_bytes()).into())) })
    }

    fn router() -> Router {
        Router::builder().route("/", reply("index")).route("/static/logo.png", reply("logo")).build().unwrap()
    }

    #[tokio::test]
    async fn exact_match() {
        let router = router();
        assert_eq!(router.len(), 2);

        let handler = router.at("/static/logo.png").unwrap();
        let response = handler.invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(full_body(&response), b"logo");

        let handler = router.at("/").unwrap();
        let response = handler.invoke(&get("/")).await.unwrap();
        assert_eq!(full_body(&response), b"index");
    }

    #[test]
    fn no_prefix_or_suffix_match() {
        let router = router();
        assert!(router.at("/static").is_none());
        assert!(router.at("/static/logo.png/").is_none());
        assert!(router.at("/STATIC/logo.png").is_none());
        assert!(router.at("").is_none());
    }

    #[test]
    fn duplicate_route() {
        let result = Router::builder().route("/a", reply("1")).route("/a", reply("2")).build();
        assert!(matches!(result, Err(RouterBuildError::DuplicateRoute { path }) if path == "/a"));
    }

    #[test]
    fn invalid_paths() {
        for path in ["", "a", "/a?b=1", "/a#top", "/a b"] {
            let result = Router::builder().route(path, reply("x")).build();
            assert!(matches!(result, Err(RouterBuildError::InvalidPath { .. })), "{path:?}");
        }
    }

    #[test]
    fn paths_are_sorted() {
        assert_eq!(router().paths(), vec!["/", "/static/logo.png"]);
    }
}
