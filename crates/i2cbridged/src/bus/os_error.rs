use std::io;

use nix::errno::Errno;

/// Renders an adapter failure the way `strerror(3)` would, so peers see
/// `No such device or address` rather than Rust's `(os error 6)` suffix.
pub fn os_error_text(error: &io::Error) -> String {
    match error.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_owned(),
        None => error.to_string(),
    }
}
