//! BSON serializer for JSON documents.
//!
//! Document layout:
//!
//! ```text
//! +-------------+----------------------------------+------+
//! | total_len   | element*                         | 0x00 |
//! | 4 bytes LE  | type (1) | key cstring | value   |      |
//! +-------------+----------------------------------+------+
//! ```
//!
//! JSON values map onto BSON types as follows: numbers become int32 when they
//! fit, int64 when they don't, and double otherwise; arrays become documents
//! keyed by decimal index. Object keys keep their input order, since the
//! server compares embedded documents field by field.

use crate::document::DocumentSerializer;
use crate::error::DocumentError;
use bytes::BufMut;
use serde_json::{Map, Number, Value};

const TYPE_DOUBLE: u8 = 0x01;
const TYPE_STRING: u8 = 0x02;
const TYPE_DOCUMENT: u8 = 0x03;
const TYPE_ARRAY: u8 = 0x04;
const TYPE_BOOL: u8 = 0x08;
const TYPE_NULL: u8 = 0x0A;
const TYPE_INT32: u8 = 0x10;
const TYPE_INT64: u8 = 0x12;

/// Smallest possible document: length prefix plus terminator.
pub const EMPTY_DOCUMENT_SIZE: usize = 5;

/// Serializes `serde_json::Value` objects as BSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonSerializer;

impl BsonSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serializes `doc` into a freshly allocated buffer.
    pub fn to_vec(&self, doc: &Value) -> Result<Vec<u8>, DocumentError> {
        let size = self.calculate_size(doc)?;
        let mut buf = vec![0u8; size];
        self.serialize_into(doc, &mut buf, 0)?;
        Ok(buf)
    }
}

impl DocumentSerializer for BsonSerializer {
    type Document = Value;

    fn calculate_size(&self, doc: &Value) -> Result<usize, DocumentError> {
        let map = as_document(doc)?;
        let size = map_size(map)?;
        if size > i32::MAX as usize {
            return Err(DocumentError::TooLarge(size));
        }
        Ok(size)
    }

    fn serialize_into(
        &self,
        doc: &Value,
        buf: &mut [u8],
        offset: usize,
    ) -> Result<usize, DocumentError> {
        let map = as_document(doc)?;
        let mut w = DocWriter { buf, pos: offset };
        w.write_map(map)?;
        // Position of the trailing terminator
        Ok(w.pos - 1)
    }
}

fn as_document(doc: &Value) -> Result<&Map<String, Value>, DocumentError> {
    match doc {
        Value::Object(map) => Ok(map),
        Value::Null => Err(DocumentError::NotADocument("null")),
        Value::Bool(_) => Err(DocumentError::NotADocument("bool")),
        Value::Number(_) => Err(DocumentError::NotADocument("number")),
        Value::String(_) => Err(DocumentError::NotADocument("string")),
        Value::Array(_) => Err(DocumentError::NotADocument("array")),
    }
}

enum NumberKind {
    Int32(i32),
    Int64(i64),
    Double(f64),
}

fn classify(n: &Number) -> Result<NumberKind, DocumentError> {
    if let Some(i) = n.as_i64() {
        return Ok(match i32::try_from(i) {
            Ok(small) => NumberKind::Int32(small),
            Err(_) => NumberKind::Int64(i),
        });
    }
    if n.is_u64() {
        return Err(DocumentError::UnsupportedValue(format!(
            "integer {} does not fit in int64",
            n
        )));
    }
    match n.as_f64() {
        Some(f) => Ok(NumberKind::Double(f)),
        None => Err(DocumentError::UnsupportedValue(format!("number {}", n))),
    }
}

fn check_key(key: &str) -> Result<(), DocumentError> {
    if key.as_bytes().contains(&0) {
        return Err(DocumentError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn element_size(key_len: usize, value: &Value) -> Result<usize, DocumentError> {
    Ok(1 + key_len + 1 + value_size(value)?)
}

fn map_size(map: &Map<String, Value>) -> Result<usize, DocumentError> {
    let mut size = 4 + 1;
    for (key, value) in map {
        check_key(key)?;
        size += element_size(key.len(), value)?;
    }
    Ok(size)
}

fn array_size(items: &[Value]) -> Result<usize, DocumentError> {
    let mut size = 4 + 1;
    for (index, value) in items.iter().enumerate() {
        size += element_size(index.to_string().len(), value)?;
    }
    Ok(size)
}

fn value_size(value: &Value) -> Result<usize, DocumentError> {
    Ok(match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(n) => match classify(n)? {
            NumberKind::Int32(_) => 4,
            NumberKind::Int64(_) | NumberKind::Double(_) => 8,
        },
        Value::String(s) => 4 + s.len() + 1,
        Value::Object(map) => map_size(map)?,
        Value::Array(items) => array_size(items)?,
    })
}

fn type_byte(value: &Value) -> Result<u8, DocumentError> {
    Ok(match value {
        Value::Null => TYPE_NULL,
        Value::Bool(_) => TYPE_BOOL,
        Value::Number(n) => match classify(n)? {
            NumberKind::Int32(_) => TYPE_INT32,
            NumberKind::Int64(_) => TYPE_INT64,
            NumberKind::Double(_) => TYPE_DOUBLE,
        },
        Value::String(_) => TYPE_STRING,
        Value::Object(_) => TYPE_DOCUMENT,
        Value::Array(_) => TYPE_ARRAY,
    })
}

struct DocWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl DocWriter<'_> {
    fn reserve(&mut self, len: usize) -> Result<&mut [u8], DocumentError> {
        let end = match self.pos.checked_add(len) {
            Some(end) if end <= self.buf.len() => end,
            _ => {
                return Err(DocumentError::BufferTooSmall {
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

    fn put_slice(&mut self, src: &[u8]) -> Result<(), DocumentError> {
        self.reserve(src.len())?.copy_from_slice(src);
        Ok(())
    }

    fn put_u8(&mut self, value: u8) -> Result<(), DocumentError> {
        self.put_slice(&[value])
    }

    fn put_i32_le(&mut self, value: i32) -> Result<(), DocumentError> {
        let mut dst = self.reserve(4)?;
        dst.put_i32_le(value);
        Ok(())
    }

    fn put_i64_le(&mut self, value: i64) -> Result<(), DocumentError> {
        let mut dst = self.reserve(8)?;
        dst.put_i64_le(value);
        Ok(())
    }

    fn put_f64_le(&mut self, value: f64) -> Result<(), DocumentError> {
        let mut dst = self.reserve(8)?;
        dst.put_f64_le(value);
        Ok(())
    }

    fn put_cstring(&mut self, value: &str) -> Result<(), DocumentError> {
        self.put_slice(value.as_bytes())?;
        self.put_u8(0)
    }

    /// Backfills the length prefix of the document that started at `start`.
    fn finish_document(&mut self, start: usize) -> Result<(), DocumentError> {
        self.put_u8(0)?;
        let len = self.pos - start;
        let len = i32::try_from(len).map_err(|_| DocumentError::TooLarge(len))?;
        let mut dst = &mut self.buf[start..start + 4];
        dst.put_i32_le(len);
        Ok(())
    }

    fn write_map(&mut self, map: &Map<String, Value>) -> Result<(), DocumentError> {
        let start = self.pos;
        self.put_i32_le(0)?;
        for (key, value) in map {
            check_key(key)?;
            self.write_element(key, value)?;
        }
        self.finish_document(start)
    }

    fn write_array(&mut self, items: &[Value]) -> Result<(), DocumentError> {
        let start = self.pos;
        self.put_i32_le(0)?;
        for (index, value) in items.iter().enumerate() {
            self.write_element(&index.to_string(), value)?;
        }
        self.finish_document(start)
    }

    fn write_element(&mut self, key: &str, value: &Value) -> Result<(), DocumentError> {
        self.put_u8(type_byte(value)?)?;
        self.put_cstring(key)?;
        match value {
            Value::Null => Ok(()),
            Value::Bool(b) => self.put_u8(u8::from(*b)),
            Value::Number(n) => match classify(n)? {
                NumberKind::Int32(i) => self.put_i32_le(i),
                NumberKind::Int64(i) => self.put_i64_le(i),
                NumberKind::Double(f) => self.put_f64_le(f),
            },
            Value::String(s) => {
                let len = s.len() + 1;
                let len = i32::try_from(len).map_err(|_| DocumentError::TooLarge(len))?;
                self.put_i32_le(len)?;
                self.put_cstring(s)
            }
            Value::Object(map) => self.write_map(map),
            Value::Array(items) => self.write_array(items),
        }
    }
}
