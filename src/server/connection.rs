//! Per-connection state and the slab that owns it.
//!
//! `RecvBuf` is the teacher's `HttpBuf` under a name that no longer implies
//! "headers only" (this server also reads pipelined bodies through it).
//! `SendBuf` is a single-direction distillation of the teacher's
//! `StreamPump`: a pump has a `read_fd`/`write_fd` pair for proxying bytes
//! between two sockets, but a connection here only ever writes — the
//! client's bytes are read straight into `RecvBuf` and consumed by the
//! parser, never forwarded — so the read half of `StreamPump` has no
//! counterpart.

use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};

use crate::detach::CompletionSink;
use crate::parser::RequestParser;
use crate::util::fd::close_fd_quiet;

/// Ring buffer for inbound bytes, reused across pipelined requests on one
/// connection. Mirrors `protocol::http1::HttpBuf` in the teacher.
pub struct RecvBuf {
    buf: Vec<u8>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl RecvBuf {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: vec![0; cap],
            start: 0,
            end: 0,
        }
    }

    pub fn write_ptr_len(&mut self) -> (*mut u8, usize) {
        let free = self.buf.len() - self.end;
        (unsafe { self.buf.as_mut_ptr().add(self.end) }, free)
    }

    pub fn wrote(&mut self, n: usize) {
        self.end += n;
    }

    pub fn window(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Advances past bytes already dispatched. Compacts once more than half
    /// the buffer has been consumed, same threshold as the teacher.
    pub fn consume_to(&mut self, pos: usize) {
        debug_assert!(pos <= self.end);
        self.start = pos;
        if self.start > self.buf.len() / 2 {
            let len = self.end - self.start;
            self.buf.copy_within(self.start..self.end, 0);
            self.start = 0;
            self.end = len;
        }
    }
}

/// Outbound byte queue for one connection. Responses from pipelined
/// requests (and, out of order, from detached continuations) are appended
/// here and drained by `io_uring` `Send` completions.
pub struct SendBuf {
    pub buffer: Vec<u8>,
    pub sent: usize,
    pub send_in_flight: bool,
}

impl SendBuf {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(cap),
            sent: 0,
            send_in_flight: false,
        }
    }

    pub fn enqueue(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn has_pending(&self) -> bool {
        self.sent < self.buffer.len()
    }

    /// Drops bytes already written once nothing is left in flight, so the
    /// buffer doesn't grow unboundedly across a long-lived connection.
    pub fn reclaim(&mut self) {
        if self.sent >= self.buffer.len() {
            self.buffer.clear();
            self.sent = 0;
        }
    }
}

/// A shared queue of `(connection id, rendered bytes)` pairs that detached
/// continuations push into, paired with the `eventfd` used to wake the
/// owning worker's `io_uring` wait.
pub type DetachQueue = Arc<Mutex<VecDeque<(usize, Vec<u8>)>>>;

/// Delivers a detached continuation's rendered response back to the worker
/// that owns the originating connection (§4.5). Lives entirely outside
/// [`crate::detach`], which only knows about the [`CompletionSink`] trait.
pub struct DetachCompletion {
    pub queue: DetachQueue,
    pub eventfd: RawFd,
    pub conn_id: usize,
}

impl CompletionSink for DetachCompletion {
    fn complete(&self, rendered: Vec<u8>) {
        self.queue
            .lock()
            .expect("detach completion queue mutex poisoned")
            .push_back((self.conn_id, rendered));
        let one: u64 = 1;
        unsafe {
            libc::write(self.eventfd, &one as *const u64 as *const libc::c_void, 8);
        }
    }
}

pub struct Connection {
    pub id: usize,
    pub client_fd: RawFd,
    pub recv_buf: RecvBuf,
    pub send_buf: SendBuf,
    pub parser: RequestParser,
    pub completion: Arc<DetachCompletion>,
}

impl Connection {
    fn new(id: usize, client_fd: RawFd, io_cap: usize, header_cap: usize, queue: DetachQueue, eventfd: RawFd) -> Self {
        Self {
            id,
            client_fd,
            recv_buf: RecvBuf::with_capacity(header_cap),
            send_buf: SendBuf::with_capacity(io_cap),
            parser: RequestParser::new(),
            completion: Arc::new(DetachCompletion {
                queue,
                eventfd,
                conn_id: id,
            }),
        }
    }
}

/// Slab allocator with a freelist, identical in shape to the teacher's
/// `ConnectionPool` (same allocate-a-slot/teardown-releases-it lifecycle).
pub struct ConnectionPool {
    slots: Vec<Option<Connection>>,
    freelist: VecDeque<usize>,
    io_buffer_capacity: usize,
    header_buffer_capacity: usize,
    queue: DetachQueue,
    eventfd: RawFd,
}

impl ConnectionPool {
    pub fn new(initial_capacity: usize, io_buffer_capacity: usize, header_buffer_capacity: usize, eventfd: RawFd) -> Self {
        Self {
            slots: Vec::with_capacity(initial_capacity),
            freelist: VecDeque::new(),
            io_buffer_capacity,
            header_buffer_capacity,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            eventfd,
        }
    }

    pub fn detach_queue(&self) -> DetachQueue {
        self.queue.clone()
    }

    pub fn alloc(&mut self) -> usize {
        if let Some(id) = self.freelist.pop_front() {
            return id;
        }
        let id = self.slots.len();
        self.slots.push(None);
        id
    }

    /// Installs a fresh `Connection` into `id`'s slot, replacing accept's
    /// placeholder (`client_fd = -1`) with the accepted socket.
    pub fn ensure_slot(&mut self, id: usize, client_fd: RawFd) {
        if id >= self.slots.len() {
            self.slots.resize_with(id + 1, || None);
        }
        self.slots[id] = Some(Connection::new(
            id,
            client_fd,
            self.io_buffer_capacity,
            self.header_buffer_capacity,
            self.queue.clone(),
            self.eventfd,
        ));
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Connection> {
        self.slots.get_mut(id).and_then(|slot| slot.as_mut())
    }

    pub fn teardown(&mut self, id: usize) {
        if let Some(conn) = self.slots.get_mut(id).and_then(|slot| slot.take()) {
            if conn.client_fd >= 0 {
                close_fd_quiet(conn.client_fd);
            }
            self.freelist.push_back(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_buf_compacts_past_halfway() {
        let mut buf = RecvBuf::with_capacity(16);
        let (ptr, len) = buf.write_ptr_len();
        assert_eq!(len, 16);
        unsafe { std::ptr::write_bytes(ptr, b'x', 10) };
        buf.wrote(10);
        buf.consume_to(9);
        assert_eq!(buf.start, 0);
        assert_eq!(buf.end, 1);
    }

    #[test]
    fn send_buf_reclaims_once_drained() {
        let mut buf = SendBuf::with_capacity(8);
        buf.enqueue(b"hello");
        buf.sent = 5;
        assert!(!buf.has_pending());
        buf.reclaim();
        assert!(buf.buffer.is_empty());
        assert_eq!(buf.sent, 0);
    }

    #[test]
    fn pool_reuses_freed_slots() {
        let mut pool = ConnectionPool::new(4, 1024, 1024, -1);
        let id = pool.alloc();
        pool.ensure_slot(id, 7);
        assert_eq!(pool.get_mut(id).unwrap().client_fd, 7);
        pool.teardown(id);
        assert!(pool.get_mut(id).is_none());
        let reused = pool.alloc();
        assert_eq!(reused, id);
    }
}
