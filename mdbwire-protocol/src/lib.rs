//! # mdbwire-protocol
//!
//! Wire protocol encoding for document database commands.
//!
//! This crate provides:
//! - The shared message envelope (length, request id, opcode) and opcode registry
//! - A bounded little-endian writer used for every fixed-width field
//! - The document serializer seam plus a BSON serializer for JSON values
//! - Size-limit policies applied before any buffer is allocated
//! - The `OP_DELETE` command encoder

pub mod bson;
pub mod command;
pub mod delete;
pub mod document;
pub mod error;
pub mod header;
pub mod limits;
pub mod writer;

pub use bson::BsonSerializer;
pub use command::{encode_command, WireCommand};
pub use delete::{encode_delete, DeleteCommand, DeleteFlags, DeleteRequest};
pub use document::{DocumentSerializer, Selector};
pub use error::{DocumentError, EncodeError, ProtocolError};
pub use header::{next_request_id, MsgHeader, OpCode, RequestIdAllocator, HEADER_SIZE};
pub use limits::SizeLimitPolicy;
pub use writer::WireWriter;

/// Default maximum size of a single document (16 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum size of a whole wire message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 48_000_000;
