//! The per-request facade handed to handlers, and its owned counterpart
//! for the detach escape hatch.
//!
//! [`Request`] borrows from the connection's input window and the
//! connection's reusable [`RequestParser`]; it cannot outlive the event
//! loop turn that produced it. A handler that needs to keep working past
//! that turn calls [`Request::detach`], which captures a [`DetachedRequest`]
//! — an owned snapshot — and hands it to [`crate::detach`]'s worker pool.

use std::cell::Cell;
use std::sync::Arc;

use crate::bytes::{ascii_decimal_to_i64, copy_to_owned, eq_ignore_ascii_case, nth_path_segment};
use crate::detach::{self, CompletionSink};
use crate::method::{Method, Protocol};
use crate::parser::RequestParser;
use crate::response::{self, Response};
use crate::router::HandlerResult;

/// A live, borrowed view of one parsed request.
///
/// Any data reachable from a `Request` is shared by default and must not
/// be kept past the handler call that received it — use [`Request::detach`]
/// or an explicit copy (`path_segment`/`body`/`header` all return borrowed
/// views) to keep data longer.
pub struct Request<'a> {
    parser: &'a RequestParser,
    input: &'a [u8],
    body: &'a [u8],
    detached: &'a Cell<bool>,
    sink: Arc<dyn CompletionSink>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(
        parser: &'a RequestParser,
        input: &'a [u8],
        body: &'a [u8],
        detached: &'a Cell<bool>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            parser,
            input,
            body,
            detached,
            sink,
        }
    }

    pub fn method(&self) -> Method {
        self.parser.method()
    }

    pub fn version(&self) -> Protocol {
        self.parser.version()
    }

    /// The request path, not including any query string.
    pub fn path(&self) -> &'a [u8] {
        self.parser.path(self.input)
    }

    /// The `n`th `/`-separated path segment (0-indexed, after the leading
    /// slash), or empty if the path has fewer than `n + 1` segments.
    pub fn path_segment(&self, n: usize) -> &'a [u8] {
        nth_path_segment(self.path(), n)
    }

    /// [`Request::path_segment`] decoded as a base-10 integer.
    pub fn path_int(&self, n: usize) -> i64 {
        ascii_decimal_to_i64(self.path_segment(n))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.parser.find_header(self.input, name)
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// `-1` if the request had no `Content-Length` header.
    pub fn body_length(&self) -> i64 {
        self.parser.content_length()
    }

    pub fn host(&self) -> Option<&'a [u8]> {
        self.header(b"Host")
    }

    /// Hands this request off to run outside the event loop.
    ///
    /// Marks the request as detached (the dispatcher will not render or
    /// enqueue a response for it) and copies every borrowed view `self`
    /// exposes into an owned [`DetachedRequest`], since the continuation
    /// runs on a separate thread after the current turn ends and the
    /// connection's buffers may already be reused by then. `continuation`
    /// runs on a thread from [`crate::detach`]'s fixed-size pool; if it
    /// returns `Err`, the dispatcher substitutes a `500 Internal Server
    /// Error` response before rendering and delivering it.
    pub fn detach<F>(self, continuation: F)
    where
        F: FnOnce(DetachedRequest, &mut Response) -> HandlerResult + Send + 'static,
    {
        self.detached.set(true);
        let snapshot = DetachedRequest::capture(self.parser, self.input, self.body);
        let sink = self.sink.clone();
        detach::submit(Box::new(move || {
            let mut response = response::acquire();
            if let Err(err) = continuation(snapshot, &mut response) {
                tracing::error!(error = %err, "detached handler failed");
                response.reset();
                response.status(500);
                response.write(b"Internal Server Error");
            }
            let mut rendered = Vec::new();
            response.render(&mut rendered);
            response::release(response);
            sink.complete(rendered);
        }));
    }
}

/// An owned snapshot of a [`Request`], safe to move across threads.
///
/// Exposes the same read API as `Request`, minus `detach` (a detached
/// continuation already runs off the event loop; detaching again would
/// have nothing left to hand off).
pub struct DetachedRequest {
    method: Method,
    version: Protocol,
    path: Box<[u8]>,
    body: Vec<u8>,
    headers: Vec<(Box<[u8]>, Box<[u8]>)>,
    content_length: i64,
}

impl DetachedRequest {
    fn capture(parser: &RequestParser, input: &[u8], body: &[u8]) -> Self {
        Self {
            method: parser.method(),
            version: parser.version(),
            path: copy_to_owned(parser.path(input)).into_boxed_slice(),
            body: copy_to_owned(body),
            headers: parser
                .headers(input)
                .map(|(name, value)| {
                    (
                        copy_to_owned(name).into_boxed_slice(),
                        copy_to_owned(value).into_boxed_slice(),
                    )
                })
                .collect(),
            content_length: parser.content_length(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn version(&self) -> Protocol {
        self.version
    }

    pub fn path(&self) -> &[u8] {
        &self.path
    }

    pub fn path_segment(&self, n: usize) -> &[u8] {
        nth_path_segment(&self.path, n)
    }

    pub fn path_int(&self, n: usize) -> i64 {
        ascii_decimal_to_i64(self.path_segment(n))
    }

    pub fn header(&self, name: &[u8]) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| eq_ignore_ascii_case(n, name))
            .map(|(_, v)| v.as_ref())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_length(&self) -> i64 {
        self.content_length
    }

    pub fn host(&self) -> Option<&[u8]> {
        self.header(b"Host")
    }
}
