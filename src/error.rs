//! Unified error type.

/// The error type returned by loupe's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as
/// [`Failure`](crate::Failure) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding to a port, accepting a connection, or
/// loading a log policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid log policy: {0}")]
    Policy(#[from] toml::de::Error),
}
