//! Listener setup. The teacher's `make_backend_socket` has no counterpart
//! here — this server has no backend leg — so only the `SO_REUSEPORT`
//! listener constructor survives.

use std::io;
use std::net::{SocketAddr, TcpListener};

use socket2::{Domain, Protocol, Socket, Type};

/// Creates a `SO_REUSEPORT` listening socket so that one worker per core
/// can bind the same address and let the kernel distribute connections
/// across them.
pub fn make_reuseport_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let sock = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    sock.set_reuse_address(true)?;
    sock.set_reuse_port(true)?;
    sock.bind(&addr.into())?;
    sock.listen(1024)?;
    Ok(sock.into())
}
