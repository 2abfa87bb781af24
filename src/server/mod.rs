//! The event-loop layer: one `io_uring` worker per CPU core, each with its
//! own `SO_REUSEPORT` listener, pinned via `core_affinity` exactly as the
//! teacher's `main.rs` does it.

pub mod config;
pub mod connection;
pub mod constants;
pub mod socket;
pub mod uring_ops;
pub mod user_data;
pub mod worker;

use std::os::fd::AsRawFd;
use std::thread;

pub use config::ServerConfig;

use crate::detach;
use crate::error::ServeError;
use crate::router::RouteTree;
use socket::make_reuseport_listener;
use worker::run_worker;

/// Starts the detach pool and spawns one pinned `io_uring` worker per core,
/// each serving `routes` over its own `SO_REUSEPORT` listener bound to
/// `config.address`. Blocks until every worker thread exits (which, absent
/// a fatal `io_uring` error, is never).
pub fn serve(routes: RouteTree, config: ServerConfig) -> Result<(), ServeError> {
    detach::init_detach_pool(config.detach_threads);

    let cores = core_affinity::get_core_ids().unwrap_or_default();
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let worker_count = config
        .worker_count
        .unwrap_or(available)
        .min(cores.len().max(1))
        .max(1);

    tracing::info!(address = %config.address, workers = worker_count, "starting server");

    let mut handles = Vec::with_capacity(worker_count);
    for i in 0..worker_count {
        let listener = make_reuseport_listener(config.address).map_err(ServeError::Socket)?;
        let core = cores.get(i).copied();
        let routes = routes.clone();
        let worker_config = config.clone();

        let handle = thread::Builder::new()
            .name(format!("kestrel-worker-{i}"))
            .spawn(move || {
                if let Some(core) = core {
                    core_affinity::set_for_current(core);
                }
                let listen_fd = listener.as_raw_fd();
                if let Err(err) = run_worker(listen_fd, routes, &worker_config) {
                    tracing::error!(worker = i, error = %err, "worker event loop exited");
                }
            })
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}
