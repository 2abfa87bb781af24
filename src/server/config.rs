//! Server-wide tuning knobs (§4.9), with the teacher codebase's hard-coded
//! constants promoted to explicit, overridable defaults.

use std::net::SocketAddr;

use super::constants;

/// Configuration for [`super::serve`].
///
/// Every field has a default matching what the teacher codebase hard-coded
/// inline; an embedder only needs to override what it cares about.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address every worker's `SO_REUSEPORT` listener binds to.
    pub address: SocketAddr,
    /// Number of event-loop workers to spawn. `None` means one per
    /// available core (the teacher's default).
    pub worker_count: Option<usize>,
    /// Size of each worker's `io_uring` submission/completion queue.
    pub ring_size: u32,
    /// Initial capacity of each connection's output buffer.
    pub io_buffer_capacity: usize,
    /// Initial capacity of each connection's input (header/body) buffer.
    pub header_buffer_capacity: usize,
    /// Number of accept operations kept outstanding per worker.
    pub initial_accepts: usize,
    /// Initial capacity of each worker's connection slab.
    pub pool_capacity: usize,
    /// Number of OS threads in the detach pool (§4.5). Shared process-wide,
    /// not per worker.
    pub detach_threads: usize,
}

impl ServerConfig {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            ..Self::default_with_address(address)
        }
    }

    fn default_with_address(address: SocketAddr) -> Self {
        Self {
            address,
            worker_count: None,
            ring_size: constants::RING_SIZE,
            io_buffer_capacity: constants::IO_BUFFER_CAPACITY,
            header_buffer_capacity: constants::HEADER_BUFFER_CAPACITY,
            initial_accepts: constants::INITIAL_ACCEPTS_PER_WORKER,
            pool_capacity: constants::CONNECTION_POOL_CAPACITY,
            detach_threads: constants::DETACH_THREADS,
        }
    }
}

impl Default for ServerConfig {
    /// Binds `0.0.0.0:0`; callers will almost always set `address` explicitly.
    fn default() -> Self {
        Self::default_with_address("0.0.0.0:0".parse().unwrap())
    }
}
