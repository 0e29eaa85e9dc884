//! Document serializer seam and selector representation.

use crate::error::DocumentError;
use bytes::Bytes;

/// Converts a structured document into its binary encoding.
pub trait DocumentSerializer {
    /// The structured document type this serializer accepts.
    type Document;

    /// Returns the number of bytes `doc` occupies once serialized.
    fn calculate_size(&self, doc: &Self::Document) -> Result<usize, DocumentError>;

    /// Serializes `doc` into `buf` starting at `offset`.
    ///
    /// The encoding is length-prefixed and NUL-terminated. Returns the offset
    /// one past the last content byte, which is the position of the trailing
    /// terminator: a document written at `offset` spans
    /// `returned - offset + 1` bytes.
    fn serialize_into(
        &self,
        doc: &Self::Document,
        buf: &mut [u8],
        offset: usize,
    ) -> Result<usize, DocumentError>;
}

impl<S: DocumentSerializer + ?Sized> DocumentSerializer for &S {
    type Document = S::Document;

    fn calculate_size(&self, doc: &Self::Document) -> Result<usize, DocumentError> {
        (**self).calculate_size(doc)
    }

    fn serialize_into(
        &self,
        doc: &Self::Document,
        buf: &mut [u8],
        offset: usize,
    ) -> Result<usize, DocumentError> {
        (**self).serialize_into(doc, buf, offset)
    }
}

/// Match criteria for a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector<D> {
    /// A structured document, serialized during encoding.
    Document(D),
    /// A pre-framed document whose first 4 bytes declare its own length.
    Raw(Bytes),
}

impl<D> Selector<D> {
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Selector::Raw(bytes.into())
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Selector::Raw(_))
    }

    /// Returns the length declared by a raw selector's prefix.
    ///
    /// Buffers shorter than the prefix declare 0. Returns `None` for
    /// structured selectors.
    pub fn raw_declared_len(&self) -> Option<usize> {
        match self {
            Selector::Raw(bytes) => Some(declared_len(bytes)),
            Selector::Document(_) => None,
        }
    }
}

/// Reads the little-endian length prefix of a pre-framed document.
pub fn declared_len(bytes: &[u8]) -> usize {
    match bytes.get(..4) {
        Some(prefix) => u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize,
        None => 0,
    }
}
