//! Unified error type.

use std::fmt;
use std::net::AddrParseError;

/// The error type returned by gyre's fallible operations.
///
/// Request-level failures (404, `Context::fail`, recovered panics) are HTTP
/// responses, not `Error`s. This type surfaces infrastructure failures:
/// parsing the bind address, binding the port, loading templates.
#[derive(Debug)]
pub enum Error {
    /// The bind address is not a valid `host:port`.
    Addr(AddrParseError),
    Io(std::io::Error),
    /// A template failed to parse or the glob was invalid.
    Template(tera::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(e) => write!(f, "invalid address: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Template(e) => write!(f, "template: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Template(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::Template(e)
    }
}
