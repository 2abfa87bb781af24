use std::io;
use std::os::fd::RawFd;

/// Closes `fd`, logging rather than propagating a failure — by the time a
/// connection is torn down there is no caller left to hand an error to.
pub fn close_fd_quiet(fd: RawFd) {
    let ret = unsafe { libc::close(fd) };
    if ret != 0 {
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EBADF) => tracing::warn!(fd, "close() -> EBADF (double close or invalid fd)"),
            Some(libc::EINTR) => tracing::warn!(fd, "close() interrupted by signal; not retrying"),
            _ => tracing::warn!(fd, error = %err, "close() failed"),
        }
    }
}
