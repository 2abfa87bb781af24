//! `io_uring` SQE submission helpers, one per operation kind.

use std::os::fd::RawFd;
use std::ptr;

use io_uring::{opcode, types, IoUring};

use super::connection::Connection;
use super::user_data::{pack_user_data, Operation, NO_ID};

pub fn post_accept(ring: &mut IoUring, listen_fd: RawFd, conn_id: usize) {
    let sqe = opcode::Accept::new(types::Fd(listen_fd), ptr::null_mut(), ptr::null_mut())
        .build()
        .user_data(pack_user_data(conn_id, Operation::Accept));
    unsafe {
        ring.submission().push(&sqe).expect("SQ full (accept)");
    }
}

pub fn post_recv(ring: &mut IoUring, conn: &mut Connection) {
    let (ptr, len) = conn.recv_buf.write_ptr_len();
    if len == 0 {
        return;
    }
    let sqe = opcode::Recv::new(types::Fd(conn.client_fd), ptr, len as u32)
        .build()
        .user_data(pack_user_data(conn.id, Operation::Recv));
    unsafe {
        ring.submission().push(&sqe).expect("SQ full (recv)");
    }
}

/// Posts a send for whatever is left unsent in `conn.send_buf`. No-op if a
/// send is already outstanding or nothing is pending.
pub fn post_send(ring: &mut IoUring, conn: &mut Connection) {
    if conn.send_buf.send_in_flight || !conn.send_buf.has_pending() {
        return;
    }
    let ptr = unsafe { conn.send_buf.buffer.as_ptr().add(conn.send_buf.sent) };
    let len = (conn.send_buf.buffer.len() - conn.send_buf.sent) as u32;
    let sqe = opcode::Send::new(types::Fd(conn.client_fd), ptr, len)
        .build()
        .user_data(pack_user_data(conn.id, Operation::Send));
    conn.send_buf.send_in_flight = true;
    unsafe {
        ring.submission().push(&sqe).expect("SQ full (send)");
    }
}

/// Posts (or re-arms) the persistent read on the worker's `eventfd`, woken
/// by a detached continuation's [`crate::detach::CompletionSink::complete`].
pub fn post_detach_wake_read(ring: &mut IoUring, eventfd: RawFd, scratch: &mut [u8; 8]) {
    let sqe = opcode::Read::new(types::Fd(eventfd), scratch.as_mut_ptr(), 8)
        .build()
        .user_data(pack_user_data(NO_ID, Operation::DetachWake));
    unsafe {
        ring.submission().push(&sqe).expect("SQ full (detach wake)");
    }
}
