//! The response builder and its process-wide free-list pool.
//!
//! Mirrors the source's `sync.Pool`-backed `Response`: a flat free list
//! behind a lock, lazily initialized and never torn down. The concrete
//! shape (`OnceLock<Mutex<Vec<T>>>`) follows [`crate::detach`]'s pool and
//! this codebase's `BackendPool` singleton before it.

use std::sync::{Mutex, OnceLock};

fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

const SERVER_HEADER_VALUE: &str = concat!("kestrel/", env!("CARGO_PKG_VERSION"));

/// A builder for an HTTP/1.1 response, drawn from and returned to
/// [`acquire`]/[`release`]'s process-wide pool.
#[derive(Debug)]
pub struct Response {
    status: u16,
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    fn new() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Appends `bytes` to the body, returning the count written (mirrors
    /// the source's `io.Writer`-shaped `Write`).
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.body.extend_from_slice(bytes);
        bytes.len()
    }

    /// Appends `s` to the body. Chainable.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        self.body.extend_from_slice(s.as_bytes());
        self
    }

    /// Sets the status code. Chainable; may be called more than once.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    /// Appends a header pair. Chainable. Not deduplicated against the
    /// `Server`/`Content-Length` headers automatically added at render time.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Clears the body and headers and resets the status to 200, without
    /// returning the `Response` to the pool. Used by the dispatcher when a
    /// handler fails and the response must be rebuilt as a 500.
    pub fn reset(&mut self) {
        self.status = 200;
        self.body.clear();
        self.headers.clear();
    }

    /// Renders the response into `into`, in wire order: status line,
    /// `Server` header, handler-added headers in insertion order,
    /// `Content-Length`, the blank line, then the body. Always written as
    /// HTTP/1.1 regardless of the request's version (documented limitation,
    /// §6).
    pub fn render(&self, into: &mut Vec<u8>) {
        into.extend_from_slice(b"HTTP/1.1 ");
        into.extend_from_slice(self.status.to_string().as_bytes());
        into.push(b' ');
        into.extend_from_slice(reason_phrase(self.status).as_bytes());
        into.extend_from_slice(b"\r\nServer: ");
        into.extend_from_slice(SERVER_HEADER_VALUE.as_bytes());
        into.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            into.extend_from_slice(name.as_bytes());
            into.extend_from_slice(b": ");
            into.extend_from_slice(value.as_bytes());
            into.extend_from_slice(b"\r\n");
        }
        into.extend_from_slice(b"Content-Length: ");
        into.extend_from_slice(self.body.len().to_string().as_bytes());
        into.extend_from_slice(b"\r\n\r\n");
        into.extend_from_slice(&self.body);
    }
}

static RESPONSE_POOL: OnceLock<Mutex<Vec<Response>>> = OnceLock::new();

fn pool() -> &'static Mutex<Vec<Response>> {
    RESPONSE_POOL.get_or_init(|| Mutex::new(Vec::new()))
}

/// Takes a `Response` from the pool, allocating a fresh one if the pool is
/// empty. There is no hard ceiling on pool growth (§7).
pub fn acquire() -> Response {
    pool()
        .lock()
        .expect("response pool mutex poisoned")
        .pop()
        .unwrap_or_default()
}

/// Resets and returns `response` to the pool for reuse.
pub fn release(mut response: Response) {
    response.reset();
    pool().lock().expect("response pool mutex poisoned").push(response);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_documented_order() {
        let mut res = Response::new();
        res.status(201);
        res.add_header("X-Request-Id", "abc");
        res.write_string("hello");
        let mut out = Vec::new();
        res.render(&mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("Server: kestrel/"));
        assert!(text.contains("X-Request-Id: abc\r\n"));
        assert!(text.contains("Content-Length: 5\r\n\r\nhello"));
    }

    #[test]
    fn default_status_is_200() {
        let mut res = Response::new();
        let mut out = Vec::new();
        res.render(&mut out);
        assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn reset_clears_body_headers_and_status() {
        let mut res = Response::new();
        res.status(404).add_header("X-A", "1").write_string("gone");
        res.reset();
        let mut out = Vec::new();
        res.render(&mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(!text.contains("X-A"));
        assert!(text.contains("Content-Length: 0"));
    }

    #[test]
    fn rendering_twice_after_reset_is_identical() {
        let mut res = Response::new();
        res.write_string("same");
        let mut first = Vec::new();
        res.render(&mut first);
        res.reset();
        res.write_string("same");
        let mut second = Vec::new();
        res.render(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn acquire_and_release_round_trip() {
        let mut res = acquire();
        res.status(500).write_string("boom");
        release(res);
        let recycled = acquire();
        // release() resets before returning to the pool.
        let mut out = Vec::new();
        recycled.render(&mut out);
        assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 200 OK\r\n"));
    }
}
