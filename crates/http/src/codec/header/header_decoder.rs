//! Request header decoding.
//!
//! The request line and header block are parsed with `httparse`, then converted into a
//! typed [`RequestHeader`] without copying header values: the byte ranges of every name
//! and value are recorded first, the header block is split off the read buffer, and the
//! values are sliced out of the frozen block.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a request header block and reports how its body is framed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a request header block from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((header, payload_size)))` once a complete header block was parsed and
    ///   split off `src`
    /// - `Ok(None)` if more data is needed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the block exceeds the size or count limits, the version is
    /// not HTTP/1.0 or HTTP/1.1, the method, target or a header is malformed, or the body
    /// framing cannot be honoured.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // "GET / HTTP/1.1\r\n\r\n" is the shortest request worth parsing
        if src.len() < 14 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request header");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            _ => return Err(ParseError::InvalidVersion(req.version)),
        };
        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?;
        let uri = Uri::try_from(uri).map_err(|_| ParseError::InvalidUri)?;

        let header_count = req.headers.len();
        let mut header_index = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
        HeaderIndex::record(src, req.headers, &mut header_index);

        let header_bytes = src.split_to(body_offset).freeze();
        let mut header_map = HeaderMap::with_capacity(header_count);
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                .map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        let mut request = Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;
        *request.headers_mut() = header_map;

        let header = RequestHeader::from(request);
        let payload_size = parse_payload(&header)?;

        Ok(Some((header, payload_size)))
    }
}

/// Byte ranges of a header's name and value within the parsed buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

/// Determines how the request body is framed.
///
/// Only `Content-Length` framing is accepted; any `Transfer-Encoding` is rejected, and so
/// is a request carrying both headers.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    // refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(te_value), None) => {
            Err(ParseError::unsupported_body(format!("transfer-encoding {te_value:?} is not supported for request bodies")))
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::of(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_bytes_mut_lens() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Content-Length: 3
        Accept: */*

        123"##};

        let mut bytes = BytesMut::from(str);

        let (_, payload_size) = HeaderDecoder.decode(&mut bytes).unwrap().unwrap();

        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);

        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().host(), None);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);

        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(http::header::ACCEPT), Some(&HeaderValue::from_static("*/*")));
        assert_eq!(header.headers().get(http::header::HOST), Some(&HeaderValue::from_static("127.0.0.1:8080")));
        assert_eq!(header.headers().get(http::header::USER_AGENT), Some(&HeaderValue::from_static("curl/7.79.1")));
        assert!(buf.is_empty());
    }

    #[test]
    fn conditional_get() {
        let str = indoc! {r##"
        GET /static/logo.png?v=2 HTTP/1.0
        Host: 127.0.0.1:8080
        If-Modified-Since: Sun, 06 Nov 1994 08:49:37 GMT
        Connection: keep-alive

        "##};

        let mut buf = BytesMut::from(str);
        let (header, _) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.version(), Version::HTTP_10);
        assert_eq!(header.uri().path(), "/static/logo.png");
        assert_eq!(header.uri().query(), Some("v=2"));
        assert_eq!(
            header.headers().get(http::header::IF_MODIFIED_SINCE),
            Some(&HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"))
        );
        assert!(header.is_keep_alive());
    }

    #[test]
    fn partial_header() {
        let mut buf = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: 127.0.0.1");
        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 41);
    }

    #[test]
    fn too_large_header() {
        let mut buf = BytesMut::from("GET /index.html HTTP/1.1\r\nX-Padding: ");
        buf.extend_from_slice(&[b'a'; MAX_HEADER_BYTES]);

        let result = HeaderDecoder.decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn too_many_headers() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADER_NUM {
            raw.push_str(&format!("X-Header-{i}: {i}\r\n"));
        }
        raw.push_str("\r\n");

        let result = HeaderDecoder.decode(&mut BytesMut::from(raw.as_str()));
        assert!(matches!(result, Err(ParseError::TooManyHeaders { .. })));
    }

    #[test]
    fn garbage_request_line() {
        let mut buf = BytesMut::from("HELLO THERE GENERAL KENOBI\r\n\r\n");
        assert!(HeaderDecoder.decode(&mut buf).is_err());
    }

    #[test]
    fn chunked_request_body_rejected() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: 127.0.0.1:8080
        Transfer-Encoding: chunked

        "##};

        let result = HeaderDecoder.decode(&mut BytesMut::from(str));
        assert!(matches!(result, Err(ParseError::UnsupportedBody { .. })));
    }

    #[test]
    fn both_framing_headers_rejected() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: 127.0.0.1:8080
        Transfer-Encoding: chunked
        Content-Length: 10

        "##};

        let result = HeaderDecoder.decode(&mut BytesMut::from(str));
        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn invalid_content_length() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: ten

        "##};

        let result = HeaderDecoder.decode(&mut BytesMut::from(str));
        assert!(matches!(result, Err(ParseError::InvalidContentLength { .. })));
    }
}
