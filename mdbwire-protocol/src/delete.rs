//! `OP_DELETE` command encoding.
//!
//! Message layout (after the 16-byte header):
//!
//! ```text
//! +----------+--------------------+---------+-----------------------+
//! | ZERO     | full_collection    | flags   | selector document     |
//! | 4 bytes  | cstring "db.coll"  | 4 bytes | self-describing len   |
//! +----------+--------------------+---------+-----------------------+
//! ```

use crate::command::{encode_command, WireCommand};
use crate::document::{declared_len, DocumentSerializer, Selector};
use crate::error::EncodeError;
use crate::header::OpCode;
use crate::limits::SizeLimitPolicy;
use crate::writer::WireWriter;
use bytes::Bytes;

/// Delete flags bitfield. Copied to the wire verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteFlags(u32);

impl DeleteFlags {
    /// Remove only the first matching document.
    pub const SINGLE_REMOVE: u32 = 1 << 0;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_single_remove(mut self) -> Self {
        self.0 |= Self::SINGLE_REMOVE;
        self
    }

    pub fn is_single_remove(&self) -> bool {
        self.0 & Self::SINGLE_REMOVE != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Unknown bits are kept; the server decides what they mean.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

/// A logical delete request.
#[derive(Debug, Clone)]
pub struct DeleteRequest<D> {
    /// Namespace-qualified collection name ("db.collection").
    pub collection_name: String,
    /// Match criteria.
    pub selector: Selector<D>,
    pub flags: DeleteFlags,
    /// Identifier assigned before encoding.
    pub request_id: i32,
}

impl<D> DeleteRequest<D> {
    pub fn new(request_id: i32, collection_name: impl Into<String>, selector: Selector<D>) -> Self {
        Self {
            collection_name: collection_name.into(),
            selector,
            flags: DeleteFlags::new(),
            request_id,
        }
    }

    pub fn with_flags(mut self, flags: DeleteFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Rejects a raw selector whose length prefix disagrees with its size,
    /// or that is too short to carry a length prefix at all.
    fn check_framing(&self) -> Result<(), EncodeError> {
        if let Selector::Raw(bytes) = &self.selector {
            let declared = declared_len(bytes);
            if bytes.len() < 4 || declared != bytes.len() {
                return Err(EncodeError::FramingMismatch {
                    declared,
                    actual: bytes.len(),
                });
            }
        }
        Ok(())
    }

    fn check_namespace(&self) -> Result<(), EncodeError> {
        if self.collection_name.as_bytes().contains(&0) {
            return Err(EncodeError::InvalidNamespace);
        }
        Ok(())
    }
}

/// A delete request paired with the serializer for its selector.
pub struct DeleteCommand<'a, S: DocumentSerializer> {
    request: &'a DeleteRequest<S::Document>,
    serializer: &'a S,
}

impl<'a, S: DocumentSerializer> DeleteCommand<'a, S> {
    pub fn new(request: &'a DeleteRequest<S::Document>, serializer: &'a S) -> Self {
        Self {
            request,
            serializer,
        }
    }

    fn document_len(&self) -> Result<usize, EncodeError> {
        match &self.request.selector {
            Selector::Raw(bytes) => Ok(bytes.len()),
            Selector::Document(doc) => Ok(self.serializer.calculate_size(doc)?),
        }
    }
}

impl<S: DocumentSerializer> WireCommand for DeleteCommand<'_, S> {
    fn op_code(&self) -> OpCode {
        OpCode::Delete
    }

    fn request_id(&self) -> i32 {
        self.request.request_id
    }

    fn validate(&self) -> Result<(), EncodeError> {
        self.request.check_framing()?;
        self.request.check_namespace()
    }

    fn body_len(&self) -> Result<usize, EncodeError> {
        // ZERO + namespace + NUL + flags + selector
        Ok(4 + self.request.collection_name.len() + 1 + 4 + self.document_len()?)
    }

    fn write_body(&self, w: &mut WireWriter<'_>) -> Result<(), EncodeError> {
        w.put_i32_le(0)?;
        w.put_cstring(&self.request.collection_name)?;
        w.put_u32_le(self.request.flags.bits())?;

        let doc_start = w.position();
        let doc_len = match &self.request.selector {
            Selector::Raw(bytes) => {
                w.put_slice(bytes)?;
                bytes.len()
            }
            Selector::Document(doc) => {
                let end = w.write_with(|buf, offset| {
                    self.serializer.serialize_into(doc, buf, offset)
                })?;
                // The serializer reports the terminator position, not the end
                let doc_len = end
                    .checked_sub(doc_start)
                    .and_then(|n| n.checked_add(1))
                    .ok_or(EncodeError::LengthMismatch {
                        expected: doc_start,
                        actual: end,
                    })?;
                w.skip(doc_len)?;
                doc_len
            }
        };

        let len = i32::try_from(doc_len).map_err(|_| EncodeError::MessageTooLarge {
            size: doc_len,
            max: i32::MAX as usize,
        })?;
        w.patch_i32_le(doc_start, len)
    }
}

/// Encodes a delete request into a complete `OP_DELETE` message.
pub fn encode_delete<S: DocumentSerializer>(
    request: &DeleteRequest<S::Document>,
    serializer: &S,
    policy: &SizeLimitPolicy,
) -> Result<Bytes, EncodeError> {
    encode_command(&DeleteCommand::new(request, serializer), policy)
}
