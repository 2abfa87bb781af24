//! A zero-copy HTTP/1.x request parser and per-method route trie, wired up
//! to a single-threaded-per-core `io_uring` event loop.
//!
//! ```no_run
//! use kestrel::{new_router, serve, ServerConfig};
//!
//! let router = new_router();
//! router.register("@GET/greet/*", |req, res| {
//!     res.write_string(&format!("hello, {}", String::from_utf8_lossy(req.path_segment(1))));
//!     Ok(())
//! }).unwrap();
//!
//! serve(&router, ServerConfig::new("0.0.0.0:8080".parse().unwrap())).unwrap();
//! ```

mod bytes;
pub mod detach;
pub mod error;
mod method;
mod parser;
mod request;
mod response;
mod router;
mod server;
mod dispatch;
mod util;

pub use error::{ParseError, RouterError, ServeError};
pub use method::{Method, Protocol};
pub use request::{DetachedRequest, Request};
pub use response::Response;
pub use router::{Handler, HandlerResult, RouteTree, Router};
pub use server::ServerConfig;

/// Constructs an empty [`Router`], ready for [`Router::register`] calls.
pub fn new_router() -> Router {
    Router::new()
}

/// Freezes `router` and spawns the worker pool, blocking until every
/// worker exits (normally never, absent a fatal `io_uring` error).
pub fn serve(router: &Router, config: ServerConfig) -> Result<(), ServeError> {
    let routes = router.freeze();
    server::serve(routes, config)
}
