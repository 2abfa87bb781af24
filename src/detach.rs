//! The blocking escape hatch's worker pool (§4.5).
//!
//! A handler that calls [`crate::request::Request::detach`] hands a
//! continuation to a small, fixed-size pool of OS threads local to the
//! process — lazily started, sized at construction, never torn down.
//! Shape mirrors this codebase's other process-wide free lists
//! ([`crate::response`], and the teacher's `BackendPool`): a
//! `OnceLock`-guarded singleton, except here the pooled resource is a
//! thread's attention rather than a value.
//!
//! The pool has no async runtime underneath it and talks to the rest of
//! the system only through [`CompletionSink`], so this module has no
//! knowledge of `io_uring`, connections, or workers — the event-loop side
//! of the handoff lives in [`crate::server`].

use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send>;

/// Where a detached continuation's rendered response bytes go once it
/// finishes. Implemented by the connection/worker layer so it can post
/// the bytes back to the owning `io_uring` worker (wake via `eventfd`)
/// without this module depending on that machinery.
pub trait CompletionSink: Send + Sync {
    fn complete(&self, rendered: Vec<u8>);
}

struct DetachPool {
    sender: mpsc::Sender<Job>,
    // Kept alive for the process lifetime; never joined (the pool is
    // never torn down, matching the backend connection cache's lifecycle).
    _workers: Vec<JoinHandle<()>>,
}

impl DetachPool {
    fn new(thread_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = std::sync::Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(thread_count);
        for id in 0..thread_count {
            let receiver = receiver.clone();
            workers.push(
                thread::Builder::new()
                    .name(format!("kestrel-detach-{id}"))
                    .spawn(move || loop {
                        let job = {
                            let receiver = receiver.lock().expect("detach pool receiver mutex poisoned");
                            receiver.recv()
                        };
                        match job {
                            Ok(job) => job(),
                            Err(_) => break, // sender half dropped; pool shutting down
                        }
                    })
                    .expect("failed to spawn detach worker thread"),
            );
        }
        Self {
            sender,
            _workers: workers,
        }
    }

    fn submit(&self, job: Job) {
        // The receiving threads never exit while the pool is alive, so
        // this only fails if the process is tearing down.
        let _ = self.sender.send(job);
    }
}

static POOL: OnceLock<DetachPool> = OnceLock::new();
static DEFAULT_THREAD_COUNT: usize = 4;

/// Starts the detach pool with `thread_count` worker threads. Must be
/// called at most once, before the first [`submit`]; [`submit`] will
/// lazily start a pool sized [`DEFAULT_THREAD_COUNT`] if this was never
/// called.
pub fn init_detach_pool(thread_count: usize) {
    POOL.set(DetachPool::new(thread_count))
        .unwrap_or_else(|_| panic!("detach pool already initialized"));
}

fn get_pool() -> &'static DetachPool {
    POOL.get_or_init(|| DetachPool::new(DEFAULT_THREAD_COUNT))
}

/// Hands `job` to the detach pool for execution on a worker thread.
pub fn submit(job: Job) {
    get_pool().submit(job);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel as test_channel;
    use std::time::Duration;

    #[test]
    fn submitted_job_runs_on_a_worker_thread() {
        let (tx, rx) = test_channel::<i32>();
        submit(Box::new(move || {
            tx.send(42).unwrap();
        }));
        let value = rx.recv_timeout(Duration::from_secs(2)).expect("job should run");
        assert_eq!(value, 42);
    }

    #[test]
    fn many_jobs_all_complete() {
        let (tx, rx) = test_channel::<usize>();
        for i in 0..50 {
            let tx = tx.clone();
            submit(Box::new(move || {
                tx.send(i).unwrap();
            }));
        }
        let mut seen: Vec<usize> = (0..50)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).expect("job should run"))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }
}
