//! Unified error type.

use std::fmt;

/// The error type returned by the server's fallible operations.
///
/// Handler failures are HTTP [`Response`](crate::Response) values, and the
/// access-log middleware itself cannot fail. What is left is I/O: binding the
/// listener.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}
