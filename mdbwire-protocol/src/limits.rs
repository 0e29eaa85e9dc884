//! Size ceilings applied to encoded commands.

use crate::error::EncodeError;
use crate::{DEFAULT_MAX_DOCUMENT_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
use serde::{Deserialize, Serialize};

/// Size-limit policy supplied with each encode call.
///
/// Exactly one ceiling applies per call: `max_document_bytes` while document
/// validation is on, `max_message_bytes` when the caller has switched it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimitPolicy {
    /// Ceiling on the encoded command when document validation is enabled.
    pub max_document_bytes: usize,
    /// Ceiling on the encoded command when document validation is skipped.
    pub max_message_bytes: usize,
    /// Trust the selector and apply only the message-level ceiling.
    pub skip_document_validation: bool,
}

impl Default for SizeLimitPolicy {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_SIZE,
            max_message_bytes: DEFAULT_MAX_MESSAGE_SIZE,
            skip_document_validation: false,
        }
    }
}

impl SizeLimitPolicy {
    pub fn new(max_document_bytes: usize, max_message_bytes: usize) -> Self {
        Self {
            max_document_bytes,
            max_message_bytes,
            skip_document_validation: false,
        }
    }

    pub fn with_skip_document_validation(mut self, skip: bool) -> Self {
        self.skip_document_validation = skip;
        self
    }

    /// Returns the ceiling in force for this policy.
    pub fn ceiling(&self) -> usize {
        if self.skip_document_validation {
            self.max_message_bytes
        } else {
            self.max_document_bytes
        }
    }

    /// Checks an encoded command length against the active ceiling.
    pub fn check(&self, size: usize) -> Result<(), EncodeError> {
        let max = self.ceiling();
        if size <= max {
            return Ok(());
        }
        if self.skip_document_validation {
            Err(EncodeError::MessageTooLarge { size, max })
        } else {
            Err(EncodeError::DocumentTooLarge { size, max })
        }
    }
}
