//! Raw HTTP/1.1 exchanges over any byte stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }
}

/// Reads exactly one response, leaving the connection usable for the next one.
pub async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> RawResponse {
    let mut buf = Vec::new();
    let (status, headers, header_len) = loop {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        assert_ne!(n, 0, "connection closed before a complete head");
        buf.extend_from_slice(&chunk[..n]);

        let mut parsed_headers = [httparse::EMPTY_HEADER; 32];
        let mut response = httparse::Response::new(&mut parsed_headers);
        if let httparse::Status::Complete(header_len) = response.parse(&buf).unwrap() {
            let headers = response
                .headers
                .iter()
                .map(|h| (h.name.to_string(), String::from_utf8(h.value.to_vec()).unwrap()))
                .collect::<Vec<_>>();
            break (response.code.unwrap(), headers, header_len);
        }
    };

    let mut response = RawResponse { status, headers, body: buf.split_off(header_len) };
    let length = response.header("content-length").unwrap().parse::<usize>().unwrap();
    while response.body.len() < length {
        let mut chunk = [0u8; 16 * 1024];
        let n = stream.read(&mut chunk).await.unwrap();
        assert_ne!(n, 0, "connection closed inside the body");
        response.body.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(response.body.len(), length);
    response
}

pub async fn exchange<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S, request: &str) -> RawResponse {
    stream.write_all(request.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    read_response(stream).await
}
