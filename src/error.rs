use derive_more::derive::From;

use crate::codec::CodecError;

pub type Result<T> = core::result::Result<T, Error>;

/// Opaque failure reported by a [`Transport`](crate::transport::Transport).
///
/// The client never inspects it; it is wrapped into [`Error::Read`],
/// [`Error::Write`] or [`Error::Connect`] depending on the request that failed.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// An enumeration representing the errors a client operation can produce.
///
/// A missing row or column is never an error: reads report it as `None` or as
/// an empty collection.
///
/// # Variants
///
/// - `Decode` - Bytes returned by the store could not be decoded by the configured codec.
/// - `Read` - The transport failed to serve a read or a page fetch.
/// - `Write` - The transport failed to apply a write or a batch. Batches report a single
///   aggregate error; the store may have applied a subset of per-key groups.
/// - `Connect` - No seed host could be reached while opening a keyspace.
/// - `Closed` - An operation was issued after its keyspace was closed.
/// - `Config` - Invalid construction parameters (page size, family name, seed list).
/// - `UnexpectedResponse` - The transport answered with the wrong response kind.
#[derive(Debug, From)]
pub enum Error {
    #[from]
    Decode(CodecError),

    Read(TransportError),

    Write(TransportError),

    Connect(TransportError),

    Closed {
        keyspace: String,
    },

    Config(String),

    UnexpectedResponse {
        expected: &'static str,
    },
}

impl Error {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
