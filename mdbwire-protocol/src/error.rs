//! Encoding error types.

use thiserror::Error;

/// Errors raised while encoding a command into wire bytes.
///
/// Every variant is produced before the encoded message is handed back, so a
/// caller never observes a partially written buffer.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("raw selector size does not match its header size [{actual}] != [{declared}]")]
    FramingMismatch { declared: usize, actual: usize },

    #[error("namespace cannot contain a null character")]
    InvalidNamespace,

    #[error("document of {size} bytes exceeds maximum allowed document size of {max} bytes")]
    DocumentTooLarge { size: usize, max: usize },

    #[error("command of {size} bytes exceeds maximum message size of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("write of {needed} bytes at offset {offset} overruns buffer of {len} bytes")]
    BufferOverrun {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("encoded length mismatch: computed {expected} bytes, wrote {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl EncodeError {
    /// Returns whether this error is retryable.
    ///
    /// Encoding is deterministic, so the same input always fails the same way.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Errors raised by a document serializer.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("selector must be a document, got {0}")]
    NotADocument(&'static str),

    #[error("document key cannot contain a null character: {0:?}")]
    InvalidKey(String),

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("buffer too small: need {needed} bytes at offset {offset}, have {len}")]
    BufferTooSmall {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("document too large: {0} bytes")]
    TooLarge(usize),
}

/// Errors raised when interpreting envelope fields.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown opcode: {0}")]
    UnknownOpCode(i32),
}
