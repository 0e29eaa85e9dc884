//! Bounded little-endian writer over an exact-sized output buffer.
//!
//! All multi-byte fields in the protocol are little-endian; every 4-byte
//! field goes through [`WireWriter::put_i32_le`] or [`WireWriter::put_u32_le`].

use crate::error::EncodeError;
use bytes::BufMut;

/// Cursor writing into a pre-allocated buffer.
pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current write offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn reserve(&mut self, len: usize) -> Result<&mut [u8], EncodeError> {
        let end = match self.pos.checked_add(len) {
            Some(end) if end <= self.buf.len() => end,
            _ => {
                return Err(EncodeError::BufferOverrun {
                    offset: self.pos,
                    needed: len,
                    len: self.buf.len(),
                })
            }
        };
        let start = self.pos;
        self.pos = end;
        Ok(&mut self.buf[start..end])
    }

    pub fn put_i32_le(&mut self, value: i32) -> Result<(), EncodeError> {
        let mut dst = self.reserve(4)?;
        dst.put_i32_le(value);
        Ok(())
    }

    pub fn put_u32_le(&mut self, value: u32) -> Result<(), EncodeError> {
        let mut dst = self.reserve(4)?;
        dst.put_u32_le(value);
        Ok(())
    }

    pub fn put_slice(&mut self, src: &[u8]) -> Result<(), EncodeError> {
        self.reserve(src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Writes the string bytes followed by a single NUL terminator.
    pub fn put_cstring(&mut self, value: &str) -> Result<(), EncodeError> {
        self.put_slice(value.as_bytes())?;
        self.put_slice(&[0])
    }

    /// Overwrites a 4-byte field at `offset` without moving the cursor.
    pub fn patch_i32_le(&mut self, offset: usize, value: i32) -> Result<(), EncodeError> {
        if offset.checked_add(4).map_or(true, |end| end > self.buf.len()) {
            return Err(EncodeError::BufferOverrun {
                offset,
                needed: 4,
                len: self.buf.len(),
            });
        }
        let mut dst = &mut self.buf[offset..offset + 4];
        dst.put_i32_le(value);
        Ok(())
    }

    /// Hands the whole buffer and the current offset to `f` and returns the
    /// offset `f` reports. The cursor does not move; see [`WireWriter::skip`].
    pub fn write_with<F, E>(&mut self, f: F) -> Result<usize, EncodeError>
    where
        F: FnOnce(&mut [u8], usize) -> Result<usize, E>,
        EncodeError: From<E>,
    {
        Ok(f(&mut *self.buf, self.pos)?)
    }

    /// Advances the cursor over `len` bytes already written in place.
    pub fn skip(&mut self, len: usize) -> Result<(), EncodeError> {
        self.reserve(len)?;
        Ok(())
    }
}
