//! The `io_uring` event loop: one instance per CPU core, each owning its
//! own ring, connection slab, and `SO_REUSEPORT` listener slot. Shape
//! mirrors the teacher's `balancer/worker.rs::run_worker`, minus the
//! backend-proxying handlers (`handle_connect_backend`,
//! `handle_recv_backend_to_client`, ...) and plus `DetachWake` handling.

use std::os::fd::RawFd;

use io_uring::IoUring;

use crate::dispatch::{service_ready_connection, DispatchOutcome};
use crate::router::RouteTree;
use crate::server::config::ServerConfig;
use crate::server::connection::ConnectionPool;
use crate::server::user_data::{unpack_user_data, Operation};
use crate::server::uring_ops::{post_accept, post_detach_wake_read, post_recv, post_send};

/// Runs one worker's event loop to completion. Only returns on a fatal
/// `io_uring` error; a healthy worker runs for the process lifetime.
pub fn run_worker(listen_fd: RawFd, routes: RouteTree, config: &ServerConfig) -> std::io::Result<()> {
    let mut ring = IoUring::new(config.ring_size)?;
    let eventfd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK) };
    if eventfd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let mut pool = ConnectionPool::new(config.pool_capacity, config.io_buffer_capacity, config.header_buffer_capacity, eventfd);

    for _ in 0..config.initial_accepts {
        let id = pool.alloc();
        pool.ensure_slot(id, -1);
        post_accept(&mut ring, listen_fd, id);
    }

    let mut wake_scratch = [0u8; 8];
    post_detach_wake_read(&mut ring, eventfd, &mut wake_scratch);

    tracing::info!(ring_size = config.ring_size, "worker event loop starting");

    loop {
        ring.submit_and_wait(1)?;

        let mut events = Vec::new();
        {
            let mut cq = ring.completion();
            while let Some(cqe) = cq.next() {
                events.push((cqe.user_data(), cqe.result()));
            }
        }

        for (tag, res) in events {
            let (id, op) = unpack_user_data(tag);
            match op {
                Operation::Accept => handle_accept(&mut ring, &mut pool, id, res, listen_fd),
                Operation::Recv => handle_recv(&mut ring, &mut pool, &routes, id, res),
                Operation::Send => handle_send(&mut ring, &mut pool, id, res),
                Operation::DetachWake => handle_detach_wake(&mut ring, &mut pool, eventfd, &mut wake_scratch, res),
            }
        }
    }
}

fn handle_accept(ring: &mut IoUring, pool: &mut ConnectionPool, id: usize, res: i32, listen_fd: RawFd) {
    if res < 0 {
        tracing::debug!(error = res, "accept failed, re-arming");
        post_accept(ring, listen_fd, id);
        return;
    }

    tracing::debug!(client_fd = res, "accepted connection");
    pool.ensure_slot(id, res);
    if let Some(conn) = pool.get_mut(id) {
        post_recv(ring, conn);
    }

    let next = pool.alloc();
    pool.ensure_slot(next, -1);
    post_accept(ring, listen_fd, next);
}

fn handle_recv(ring: &mut IoUring, pool: &mut ConnectionPool, routes: &RouteTree, id: usize, res: i32) {
    if res <= 0 {
        pool.teardown(id);
        return;
    }

    let Some(conn) = pool.get_mut(id) else {
        return;
    };
    conn.recv_buf.wrote(res as usize);

    match service_ready_connection(conn, routes) {
        DispatchOutcome::Close => {
            pool.teardown(id);
            return;
        }
        DispatchOutcome::Continue => {}
    }

    let Some(conn) = pool.get_mut(id) else {
        return;
    };
    post_send(ring, conn);
    post_recv(ring, conn);
}

fn handle_send(ring: &mut IoUring, pool: &mut ConnectionPool, id: usize, res: i32) {
    if res < 0 {
        pool.teardown(id);
        return;
    }

    let Some(conn) = pool.get_mut(id) else {
        return;
    };
    conn.send_buf.send_in_flight = false;
    conn.send_buf.sent += res as usize;

    if conn.send_buf.has_pending() {
        post_send(ring, conn);
    } else {
        conn.send_buf.reclaim();
    }
}

fn handle_detach_wake(ring: &mut IoUring, pool: &mut ConnectionPool, eventfd: RawFd, scratch: &mut [u8; 8], res: i32) {
    if res < 0 {
        tracing::error!(error = res, "detach wake eventfd read failed");
    }

    let queue = pool.detach_queue();
    let drained: Vec<(usize, Vec<u8>)> = std::mem::take(&mut *queue.lock().expect("detach completion queue mutex poisoned")).into();

    for (conn_id, rendered) in drained {
        if let Some(conn) = pool.get_mut(conn_id) {
            conn.send_buf.enqueue(&rendered);
            post_send(ring, conn);
        } else {
            tracing::debug!(conn_id, "detached response arrived for a torn-down connection, dropping");
        }
    }

    post_detach_wake_read(ring, eventfd, scratch);
}
