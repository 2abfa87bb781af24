//! A small runnable program exercising the library's public surface:
//! a numeric-wildcard route, a free-wildcard route, a body echo, and a
//! detach example. Mirrors the three core routes of the original
//! demonstration app; not part of the library's contract.

use kestrel::{new_router, serve, ServerConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let router = new_router();

    router
        .register("@GET/#", |req, res| {
            res.status(200).write_string(&format!("Hello {}", String::from_utf8_lossy(req.path_segment(0))));
            Ok(())
        })
        .expect("router not yet frozen");

    router
        .register("@GET/greet/*", |req, res| {
            res.write_string(&format!("Hello {}", String::from_utf8_lossy(req.path_segment(1))));
            Ok(())
        })
        .expect("router not yet frozen");

    router
        .register("@POST/", |req, res| {
            res.status(200).write_string(&format!("Hello {}", String::from_utf8_lossy(req.body())));
            Ok(())
        })
        .expect("router not yet frozen");

    router
        .register("@GET/1sec", |req, _res| {
            req.detach(|_snapshot, res| {
                std::thread::sleep(std::time::Duration::from_secs(1));
                res.status(200).write_string("done");
                Ok(())
            });
            Ok(())
        })
        .expect("router not yet frozen");

    let config = ServerConfig::new("0.0.0.0:8080".parse().unwrap());
    if let Err(err) = serve(&router, config) {
        tracing::error!(error = %err, "server exited");
        std::process::exit(1);
    }
}
