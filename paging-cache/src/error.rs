use core::fmt;

use crate::RequestId;

/// Errors reported by the strict entry points of this crate.
///
/// The non-strict APIs never fail: they clamp or coerce their input instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A page size of zero was supplied.
    ZeroPageSize,
    /// A page callback was resolved after its controller had been dropped.
    Disconnected { request: RequestId },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPageSize => f.write_str("page size must be greater than zero"),
            Self::Disconnected { request } => write!(
                f,
                "controller dropped before request {} was resolved",
                request.0
            ),
        }
    }
}

impl std::error::Error for Error {}
