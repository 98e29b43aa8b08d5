//! Static resources.
//!
//! A resource either lives on disk and is looked at again on every request, or it was
//! read into memory at startup. Which one is decided when the route is built.
//!
//! Serving from disk goes through these steps, any of which may end the request:
//!
//! 1. validate: a missing or hidden file is a 404, anything but a regular file a 403
//! 2. conditional check against the file's modification time, 304 if unchanged
//! 3. open: a file that vanished since step 1 is still a 404
//! 4. headers, then the open file handed to the connection as a [`FileRegion`]

use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use http::header::IF_MODIFIED_SINCE;
use http::{HeaderValue, Response};
use lookout_http::protocol::{FileRegion, RequestContext, ResponseBody};
use tracing::debug;

use super::{RequestHandler, StaticPage};
use crate::conditional::{self, CacheDecision};
use crate::error::{RequestError, ServerError};
use crate::offloader::Offloader;

#[derive(Debug, Clone)]
pub enum ResourceSource {
    Filesystem { path: PathBuf, content_type: HeaderValue, offloader: Offloader },
    Embedded(StaticPage),
}

#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    url: String,
    source: ResourceSource,
}

impl StaticFileHandler {
    pub fn filesystem(
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        content_type: HeaderValue,
        offloader: Offloader,
    ) -> Self {
        let source = ResourceSource::Filesystem { path: path.into(), content_type, offloader };
        Self { url: url.into(), source }
    }

    /// Reads `path` once; the resource then never changes and was last modified at
    /// `loaded_at`.
    pub fn embedded(
        url: impl Into<String>,
        path: impl AsRef<Path>,
        content_type: HeaderValue,
        loaded_at: SystemTime,
    ) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let body = fs::read(path).map_err(|e| ServerError::resource(path, e))?;
        let source = ResourceSource::Embedded(StaticPage::new(body, content_type, loaded_at));
        Ok(Self { url: url.into(), source })
    }
}

#[async_trait]
impl RequestHandler for StaticFileHandler {
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, RequestError> {
        match &self.source {
            ResourceSource::Embedded(page) => Ok(page.respond(ctx)),
            ResourceSource::Filesystem { path, content_type, offloader } => {
                let url = self.url.clone();
                let path = path.clone();
                let content_type = content_type.clone();
                let if_modified_since = ctx.headers().get(IF_MODIFIED_SINCE).cloned();

                let response =
                    offloader.submit(move || serve_file(&url, &path, content_type, if_modified_since.as_ref())).await;
                Ok(response)
            }
        }
    }
}

/// Serves `path` for a request of `url`. Blocks on filesystem calls.
pub fn serve_file(
    url: &str,
    path: &Path,
    content_type: HeaderValue,
    if_modified_since: Option<&HeaderValue>,
) -> Result<Response<ResponseBody>, RequestError> {
    let metadata = validate(url, path)?;
    let last_modified = metadata.modified()?;

    if conditional::evaluate(last_modified, if_modified_since) == CacheDecision::NotModified {
        return Ok(conditional::not_modified());
    }

    let region = open(url, path)?;
    Ok(conditional::cacheable_response(content_type, last_modified, region.into()))
}

/// Opens the validated file. Its length is taken from the open handle, so the region
/// matches what will actually be read.
fn open(url: &str, path: &Path) -> Result<FileRegion, RequestError> {
    let file = File::open(path).map_err(|e| missing_or_internal(url, path, e))?;
    let length = file.metadata()?.len();
    debug!(path = %path.display(), length, "serving file");
    Ok(FileRegion::new(file, length))
}

fn validate(url: &str, path: &Path) -> Result<Metadata, RequestError> {
    if is_hidden(path) {
        debug!(path = %path.display(), "refusing hidden file");
        return Err(RequestError::not_found(url));
    }

    let metadata = fs::metadata(path).map_err(|e| missing_or_internal(url, path, e))?;
    if !metadata.is_file() {
        debug!(path = %path.display(), "refusing non regular file");
        return Err(RequestError::forbidden(url));
    }

    Ok(metadata)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()).is_some_and(|name| name.starts_with('.'))
}

fn missing_or_internal(url: &str, path: &Path, e: io::Error) -> RequestError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::NotADirectory => {
            debug!(path = %path.display(), cause = %e, "file unavailable");
            RequestError::not_found(url)
        }
        _ => RequestError::internal(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{full_body, get, request};
    use http::header::{CACHE_CONTROL, CONTENT_TYPE, LAST_MODIFIED};
    use http::{Request, StatusCode};
    use std::io::Read;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    const PNG: HeaderValue = HeaderValue::from_static("image/png");

    fn logo(dir: &TempDir) -> (PathBuf, Vec<u8>) {
        let content = (0..10_000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        let path = dir.path().join("logo.png");
        fs::write(&path, &content).unwrap();
        (path, content)
    }

    fn file_handler(path: &Path) -> StaticFileHandler {
        StaticFileHandler::filesystem("/static/logo.png", path, PNG, Offloader::current().unwrap())
    }

    fn file_body(response: Response<ResponseBody>) -> Vec<u8> {
        match response.into_body() {
            ResponseBody::File(region) => {
                let (mut file, offset, length) = region.into_parts();
                assert_eq!(offset, 0);
                let mut content = vec![];
                file.read_to_end(&mut content).unwrap();
                assert_eq!(content.len() as u64, length);
                content
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn serves_file() {
        let dir = tempfile::tempdir().unwrap();
        let (path, content) = logo(&dir);

        let response = file_handler(&path).invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[CACHE_CONTROL], "private, max-age=60");
        assert_eq!(response.body().len(), 10_000);
        assert_eq!(file_body(response), content);
    }

    #[tokio::test]
    async fn not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logo(&dir);
        let handler = file_handler(&path);

        let first = handler.invoke(&get("/static/logo.png")).await.unwrap();
        let last_modified = first.headers()[LAST_MODIFIED].clone();

        let ctx = request(Request::get("/static/logo.png").header(IF_MODIFIED_SINCE, last_modified));
        let second = handler.invoke(&ctx).await.unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert!(second.body().is_empty());
        assert!(second.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn malformed_validator_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logo(&dir);

        let ctx = request(Request::get("/static/logo.png").header(IF_MODIFIED_SINCE, "last tuesday"));
        let response = file_handler(&path).invoke(&ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().len(), 10_000);
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let response = file_handler(&dir.path().join("nope.png")).invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(full_body(&response), b"Failure: 404 Not Found\r\n");
    }

    #[tokio::test]
    async fn hidden_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".secret");
        fs::write(&path, b"hush").unwrap();

        let response = file_handler(&path).invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).unwrap();

        let response = file_handler(&assets).invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(full_body(&response), b"Failure: 403 Forbidden\r\n");
    }

    #[test]
    fn file_vanishing_after_validation() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logo(&dir);

        validate("/static/logo.png", &path).unwrap();
        fs::remove_file(&path).unwrap();

        let e = open("/static/logo.png", &path).unwrap_err();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn revalidates_file_older_than_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logo(&dir);
        let nineteen_sixty = UNIX_EPOCH - Duration::from_secs(10 * 365 * 86_400);
        File::options().write(true).open(&path).unwrap().set_modified(nineteen_sixty).unwrap();

        let first = serve_file("/static/logo.png", &path, PNG, None).unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let last_modified = first.headers()[LAST_MODIFIED].clone();
        assert_eq!(last_modified, "Thu, 01 Jan 1970 00:00:00 GMT");

        let second = serve_file("/static/logo.png", &path, PNG, Some(&last_modified)).unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn file_below_a_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = logo(&dir);

        let e = serve_file("/x", &path.join("child"), PNG, None).unwrap_err();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn embedded_resource() {
        let dir = tempfile::tempdir().unwrap();
        let (path, content) = logo(&dir);
        let loaded_at = SystemTime::now();

        let handler = StaticFileHandler::embedded("/static/logo.png", &path, PNG, loaded_at).unwrap();
        fs::remove_file(&path).unwrap();

        let response = handler.invoke(&get("/static/logo.png")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[LAST_MODIFIED], lookout_http::date::header_value(loaded_at));
        assert_eq!(full_body(&response), content.as_slice());
    }

    #[test]
    fn embedded_resource_must_exist() {
        let result = StaticFileHandler::embedded("/x", "/definitely/not/here", PNG, SystemTime::now());
        assert!(matches!(result, Err(ServerError::Resource { .. })));
    }

    #[test]
    fn hidden_names() {
        assert!(is_hidden(Path::new("/srv/.env")));
        assert!(!is_hidden(Path::new("/srv/.config/app.json")));
        assert!(!is_hidden(Path::new("/srv/logo.png")));
    }
}
