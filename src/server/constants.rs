//! Default tuning knobs, mirrored from the teacher codebase's hard-coded
//! constants (§4.9) and exposed through [`super::config::ServerConfig`].

pub const INITIAL_ACCEPTS_PER_WORKER: usize = 8;
pub const IO_BUFFER_CAPACITY: usize = 32 * 1024;
pub const HEADER_BUFFER_CAPACITY: usize = 8 * 1024;
pub const RING_SIZE: u32 = 512;
pub const DETACH_THREADS: usize = 4;
pub const CONNECTION_POOL_CAPACITY: usize = 4096;
