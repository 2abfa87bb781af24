//! Ties parser → router → handler → response rendering together (§4.4).
//!
//! This is the part of the teacher's worker loop that used to be
//! `peek_request_headers` + "copy the whole request to a Vec and stage it
//! for the backend" (`handle_recv_headers` in `balancer/worker.rs`). There
//! is no backend here: the handler runs in-process, so the staged bytes
//! are this connection's own rendered response rather than a forwarded
//! request.

use std::cell::Cell;

use crate::error::ParseError;
use crate::request::Request;
use crate::response;
use crate::router::RouteTree;
use crate::server::connection::Connection;

/// What the worker should do with the connection after a `Recv` completion
/// has been run through the dispatcher.
pub enum DispatchOutcome {
    /// Keep the connection open; more bytes (or a pending send) may follow.
    Continue,
    /// The connection is unrecoverable and must be torn down.
    Close,
}

/// Drains every complete, pipelined request sitting in `conn.recv_buf`,
/// running each through routing and the handler, and appends each
/// non-detached response to `conn.send_buf` in arrival order.
pub fn service_ready_connection(conn: &mut Connection, routes: &RouteTree) -> DispatchOutcome {
    loop {
        let window = conn.recv_buf.window();
        let consumed = match conn.parser.parse(window) {
            Ok(n) => n,
            Err(ParseError::Incomplete) => return DispatchOutcome::Continue,
            Err(err) => {
                tracing::warn!(error = %err, "closing connection after parse error");
                return DispatchOutcome::Close;
            }
        };

        let content_length = conn.parser.content_length();
        let available_after_head = window.len() - consumed;
        let body_len = if content_length < 0 {
            0
        } else {
            (content_length as usize).min(available_after_head)
        };
        let body = &window[consumed..consumed + body_len];
        let total = consumed + body_len;

        let detached = Cell::new(false);
        let mut response = response::acquire();

        match routes.find(conn.parser.method(), conn.parser.path(window)) {
            None => {
                response.status(404).write_string("Not Found");
            }
            Some(handler) => {
                let sink = conn.completion.clone();
                let req = Request::new(&conn.parser, window, body, &detached, sink);
                tracing::debug!(method = ?req.method(), path = ?String::from_utf8_lossy(req.path()), "dispatching request");
                if let Err(err) = handler(req, &mut response) {
                    tracing::error!(error = %err, "handler failed");
                    response.reset();
                    response.status(500).write_string("Internal Server Error");
                }
            }
        }

        if !detached.get() {
            response.render(&mut conn.send_buf.buffer);
        }
        response::release(response);

        let new_start = conn.recv_buf.start + total;
        conn.recv_buf.consume_to(new_start);

        if conn.recv_buf.window().is_empty() {
            return DispatchOutcome::Continue;
        }
        // Residual bytes: another pipelined request may already be sitting
        // in the window, so loop back to parsing without waiting on the
        // event loop.
    }
}
