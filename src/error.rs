use thiserror::Error;

use crate::types::ReturnCode;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// The type is `Clone` so that a single failure produced in the transport
/// completion context can be handed to every caller blocked on the same
/// [`ResultLock`](crate::lock::ResultLock).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Response buffer shorter than required for the transport scheme, or a
    /// required CoAP payload was missing.
    #[error("invalid data size: {0}")]
    InvalidSize(&'static str),

    /// Payload could not be decoded, or a required reserved field was
    /// missing or of the wrong kind.
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),

    /// Payload could not be decoded, with detail from the CBOR decoder.
    #[error("invalid payload: {0}")]
    InvalidPayloadOwned(String),

    /// Failed to encode an outgoing payload.
    #[error("encode error: {0}")]
    Encode(String),

    /// Timed out waiting for the response.
    #[error("timeout waiting for response")]
    Timeout,

    /// Failure reported by the transport completion context.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with a non-success mcumgr return code.
    #[error("mcumgr error code: {rc}")]
    ErrorCode {
        /// Classified return code reported by the peer.
        rc: ReturnCode,
    },

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl Error {
    pub(crate) fn invalid_payload_owned(msg: impl Into<String>) -> Self {
        Self::InvalidPayloadOwned(msg.into())
    }
}
