//! # Field Codec
//!
//! Composable binary field layouts for milter message bodies.
//!
//! A [`Layout`] is an ordered list of [`Field`] descriptors. Each field reads
//! from the remainder left by the fields before it, so a multi-field body is
//! declared by concatenating layouts instead of writing a bespoke parser:
//!
//! ```rust
//! use milter_protocol::core::field::{Field, Layout, Value};
//!
//! let pair = Layout::new(&[Field::Uint32]).concat(&Layout::new(&[Field::Remaining]));
//! let values = pair.decode(b"\0\0\0\x04boo").unwrap();
//! assert_eq!(values, vec![Value::Uint32(4), Value::Bytes(b"boo".to_vec().into())]);
//! ```
//!
//! ## Field widths
//! - `Uint32`: always 4 bytes, big-endian
//! - `StringList`: the whole remainder, split on NUL
//! - `Remaining`: the whole remainder, uninterpreted

use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;

/// A single field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Fixed 4-byte big-endian unsigned integer
    Uint32,
    /// NUL-terminated strings filling the rest of the buffer
    StringList,
    /// Opaque bytes filling the rest of the buffer
    Remaining,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint32(u32),
    Strings(Vec<String>),
    Bytes(Bytes),
}

impl Value {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Uint32(_) => Field::Uint32.name(),
            Value::Strings(_) => Field::StringList.name(),
            Value::Bytes(_) => Field::Remaining.name(),
        }
    }
}

impl Field {
    /// Human readable name used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Field::Uint32 => "uint32",
            Field::StringList => "string-list",
            Field::Remaining => "remaining",
        }
    }

    /// Number of leading bytes of `buf` this field consumes.
    #[inline]
    pub fn width(&self, buf: &[u8]) -> usize {
        match self {
            Field::Uint32 => 4,
            Field::StringList | Field::Remaining => buf.len(),
        }
    }

    /// Decode this field from exactly the bytes it consumes.
    pub fn decode(&self, buf: &[u8]) -> Result<Value> {
        match self {
            Field::Uint32 => {
                let raw: [u8; 4] = buf
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(ProtocolError::Incomplete {
                        needed: 4,
                        available: buf.len(),
                    })?;
                Ok(Value::Uint32(u32::from_be_bytes(raw)))
            }
            Field::StringList => {
                let mut parts: Vec<String> = buf
                    .split(|&b| b == 0)
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                // The trailing terminator always leaves one last element behind
                parts.pop();
                Ok(Value::Strings(parts))
            }
            Field::Remaining => Ok(Value::Bytes(Bytes::copy_from_slice(buf))),
        }
    }

    /// Append `value` to `out`, failing if it is the wrong kind.
    pub fn encode(&self, value: &Value, out: &mut BytesMut) -> Result<()> {
        match (self, value) {
            (Field::Uint32, Value::Uint32(n)) => out.put_u32(*n),
            (Field::StringList, Value::Strings(list)) => {
                for s in list {
                    out.put_slice(s.as_bytes());
                    out.put_u8(0);
                }
            }
            (Field::Remaining, Value::Bytes(b)) => out.put_slice(b),
            (expected, found) => {
                return Err(ProtocolError::FieldMismatch {
                    expected: expected.name(),
                    found: found.kind(),
                })
            }
        }
        Ok(())
    }
}

/// An ordered concatenation of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Cow<'static, [Field]>,
}

impl Layout {
    /// Layout over a static field list, usable in `const` tables.
    pub const fn new(fields: &'static [Field]) -> Self {
        Self {
            fields: Cow::Borrowed(fields),
        }
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Layout) -> Layout {
        let mut fields = self.fields.to_vec();
        fields.extend_from_slice(&other.fields);
        Layout {
            fields: Cow::Owned(fields),
        }
    }

    /// Total bytes consumed from the head of `buf`.
    pub fn width(&self, buf: &[u8]) -> usize {
        let mut offset = 0;
        for field in self.fields.iter() {
            let rest = buf.get(offset..).unwrap_or_default();
            offset += field.width(rest);
        }
        offset
    }

    /// Decode every field in order, each from the remainder of the previous one.
    pub fn decode(&self, buf: &[u8]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.fields.len());
        let mut rest = buf;
        for field in self.fields.iter() {
            let width = field.width(rest);
            if width > rest.len() {
                return Err(ProtocolError::Incomplete {
                    needed: width,
                    available: rest.len(),
                });
            }
            let (head, tail) = rest.split_at(width);
            values.push(field.decode(head)?);
            rest = tail;
        }
        Ok(values)
    }

    /// Encode as many leading values as the layout has fields.
    ///
    /// Returns the encoded bytes and whatever values were not consumed.
    pub fn partial_encode<'a>(&self, values: &'a [Value]) -> Result<(BytesMut, &'a [Value])> {
        let mut out = BytesMut::new();
        let mut rest = values;
        for field in self.fields.iter() {
            let (value, tail) = rest
                .split_first()
                .ok_or(ProtocolError::MissingField(field.name()))?;
            field.encode(value, &mut out)?;
            rest = tail;
        }
        Ok((out, rest))
    }

    /// Encode exactly the values this layout consumes.
    pub fn encode(&self, values: &[Value]) -> Result<Bytes> {
        let (out, leftover) = self.partial_encode(values)?;
        if !leftover.is_empty() {
            return Err(ProtocolError::EncodingOverflow(leftover.len()));
        }
        Ok(out.freeze())
    }
}
