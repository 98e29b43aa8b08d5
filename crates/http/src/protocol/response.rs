//! Response bodies and head finalization.
//!
//! A handler returns `http::Response<ResponseBody>`. The body is either nothing, bytes
//! already in memory, or a region of an open file that the connection transfers with
//! whichever strategy its transport supports.

use std::fs::File;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_TYPE, DATE};
use http::{HeaderValue, Response, StatusCode, Version};

use crate::date;

/// The head portion of a response, before the body is attached.
pub type ResponseHead = Response<()>;

const TEXT_PLAIN_UTF_8: HeaderValue = HeaderValue::from_static("text/plain; charset=UTF-8");
const CLOSE: HeaderValue = HeaderValue::from_static("close");
const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");

/// The body of a response produced by a handler.
#[derive(Debug, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Full(Bytes),
    File(FileRegion),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Empty
    }

    /// Number of bytes the body puts on the wire.
    pub fn len(&self) -> u64 {
        match self {
            ResponseBody::Empty => 0,
            ResponseBody::Full(bytes) => bytes.len() as u64,
            ResponseBody::File(region) => region.length(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Full(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        ResponseBody::Full(Bytes::from(value))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        ResponseBody::Full(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        ResponseBody::Full(Bytes::from(value))
    }
}

impl From<FileRegion> for ResponseBody {
    fn from(region: FileRegion) -> Self {
        ResponseBody::File(region)
    }
}

/// A byte range of an open file.
///
/// The region owns the file handle; dropping the response closes the file.
#[derive(Debug)]
pub struct FileRegion {
    file: File,
    offset: u64,
    length: u64,
}

impl FileRegion {
    /// The first `length` bytes of `file`.
    pub fn new(file: File, length: u64) -> Self {
        Self { file, offset: 0, length }
    }

    /// `length` bytes of `file` starting at `offset`.
    pub fn with_offset(file: File, offset: u64, length: u64) -> Self {
        Self { file, offset, length }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn into_parts(self) -> (File, u64, u64) {
        (self.file, self.offset, self.length)
    }
}

/// A plain-text failure response: `Failure: <status>\r\n`.
pub fn error_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from(format!("Failure: {status}\r\n")));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, TEXT_PLAIN_UTF_8);
    response
}

/// Normalizes the mandatory headers of a head about to be written.
///
/// `Date` is added when the handler did not set one. The `Connection` header always
/// reflects the final keep-alive decision: `close` when the connection will be closed,
/// absent for a kept HTTP/1.1 connection and `keep-alive` for a kept HTTP/1.0 one.
/// `Content-Length` is written by the header encoder from the payload framing.
pub(crate) fn finalize_head(head: &mut ResponseHead, version: Version, keep_alive: bool) {
    *head.version_mut() = if version == Version::HTTP_10 { Version::HTTP_10 } else { Version::HTTP_11 };

    let headers = head.headers_mut();
    if !headers.contains_key(DATE) {
        headers.insert(DATE, date::now());
    }

    headers.remove(CONNECTION);
    match (keep_alive, version) {
        (false, _) => {
            headers.insert(CONNECTION, CLOSE);
        }
        (true, Version::HTTP_10) => {
            headers.insert(CONNECTION, KEEP_ALIVE);
        }
        (true, _) => {}
    }
}
