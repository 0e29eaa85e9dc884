//! Standard message header shared by every command type.
//!
//! Header layout (16 bytes, all fields little-endian int32):
//!
//! ```text
//! +----------------+------------+-------------+---------+
//! | message_length | request_id | response_to | op_code |
//! |    4 bytes     |  4 bytes   |   4 bytes   | 4 bytes |
//! +----------------+------------+-------------+---------+
//! ```
//!
//! `message_length` counts the whole message, header included.

use crate::error::{EncodeError, ProtocolError};
use crate::writer::WireWriter;
use std::sync::atomic::{AtomicI32, Ordering};

/// Size of the standard message header in bytes (4+4+4+4 = 16).
pub const HEADER_SIZE: usize = 16;

/// Opcode registry for the command family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OpCode {
    /// Reply to a client request.
    Reply = 1,
    /// Update documents.
    Update = 2001,
    /// Insert documents.
    Insert = 2002,
    /// Query a collection.
    Query = 2004,
    /// Fetch more results from a cursor.
    GetMore = 2005,
    /// Delete documents.
    Delete = 2006,
    /// Close cursors.
    KillCursors = 2007,
}

impl OpCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OpCode::Reply),
            2001 => Ok(OpCode::Update),
            2002 => Ok(OpCode::Insert),
            2004 => Ok(OpCode::Query),
            2005 => Ok(OpCode::GetMore),
            2006 => Ok(OpCode::Delete),
            2007 => Ok(OpCode::KillCursors),
            _ => Err(ProtocolError::UnknownOpCode(value)),
        }
    }
}

/// The envelope written at the start of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgHeader {
    pub message_length: i32,
    pub request_id: i32,
    /// Always zero for client requests.
    pub response_to: i32,
    pub op_code: OpCode,
}

impl MsgHeader {
    /// Creates a request header for a message of `message_length` bytes.
    pub fn new(message_length: i32, request_id: i32, op_code: OpCode) -> Self {
        Self {
            message_length,
            request_id,
            response_to: 0,
            op_code,
        }
    }

    /// Writes the header at the writer's current position.
    pub fn write(&self, w: &mut WireWriter<'_>) -> Result<(), EncodeError> {
        w.put_i32_le(self.message_length)?;
        w.put_i32_le(self.request_id)?;
        w.put_i32_le(self.response_to)?;
        w.put_i32_le(self.op_code.as_i32())
    }
}

/// Hands out request identifiers.
///
/// Identifiers are unique per allocator and increase monotonically; after
/// `i32::MAX` the sequence restarts at 1.
#[derive(Debug)]
pub struct RequestIdAllocator {
    next: AtomicI32,
}

impl RequestIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicI32::new(1),
        }
    }

    /// Starts the sequence at `first` (values below 1 start at 1).
    pub const fn starting_at(first: i32) -> Self {
        let first = if first < 1 { 1 } else { first };
        Self {
            next: AtomicI32::new(first),
        }
    }

    /// Returns the next identifier.
    pub fn next_id(&self) -> i32 {
        let mut current = self.next.load(Ordering::Relaxed);
        loop {
            let following = if current == i32::MAX { 1 } else { current + 1 };
            match self.next.compare_exchange_weak(
                current,
                following,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

static REQUEST_IDS: RequestIdAllocator = RequestIdAllocator::new();

/// Returns the next process-wide request identifier.
pub fn next_request_id() -> i32 {
    REQUEST_IDS.next_id()
}
