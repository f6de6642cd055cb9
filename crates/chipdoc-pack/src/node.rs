//! Binary tag-tree node encoding.
//!
//! ```text
//! tag byte   bits 0-5 tag code, bit 6 attribute, bit 7 leaf
//! size       u32 LE, length of the body
//! body       group: child nodes
//!            leaf:  ValueKind byte, then the value
//! ```
//!
//! Leaf values: fixed-width LE scalars, UTF-8 strings, raw blobs, and arrays
//! as an element-kind byte followed by fixed-width LE elements.

use chipdoc_tree::{CursorError, CursorResult};
use chipdoc_types::{Array, Value, ValueKind};

pub const NODE_HEADER_LEN: usize = 5;

pub const LEAF: u8 = 0x80;
pub const ATTRIBUTE: u8 = 0x40;
pub const CODE_MASK: u8 = 0x3F;

/// A decoded node header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeHeader {
    pub code: u8,
    pub leaf: bool,
    pub attribute: bool,
    /// Offset of the body within the tree buffer.
    pub body: usize,
    pub size: usize,
}

impl NodeHeader {
    pub fn end(&self) -> usize {
        self.body + self.size
    }
}

fn corrupt(offset: usize, reason: impl Into<String>) -> CursorError {
    CursorError::Corrupt {
        offset,
        reason: reason.into(),
    }
}

/// Append a node header and return its offset. The size is patched later
/// for groups.
pub fn write_header(buf: &mut Vec<u8>, tag_byte: u8, size: u32) -> usize {
    let offset = buf.len();
    buf.push(tag_byte);
    buf.extend_from_slice(&size.to_le_bytes());
    offset
}

/// Back-patch the size of the group whose header starts at `offset`.
pub fn patch_size(buf: &mut [u8], offset: usize) -> CursorResult<()> {
    let body = offset + NODE_HEADER_LEN;
    let size = u32::try_from(buf.len() - body)
        .map_err(|_| CursorError::Encode("group body exceeds 4 GiB".into()))?;
    buf[offset + 1..body].copy_from_slice(&size.to_le_bytes());
    Ok(())
}

/// Decode the node header at `offset`, checking that its body ends within
/// `limit`.
pub fn read_header(buf: &[u8], offset: usize, limit: usize) -> CursorResult<NodeHeader> {
    let body = offset + NODE_HEADER_LEN;
    if body > limit {
        return Err(corrupt(offset, "truncated node header"));
    }
    let tag_byte = buf[offset];
    let mut size = [0u8; 4];
    size.copy_from_slice(&buf[offset + 1..body]);
    let size = u32::from_le_bytes(size) as usize;
    let header = NodeHeader {
        code: tag_byte & CODE_MASK,
        leaf: tag_byte & LEAF != 0,
        attribute: tag_byte & ATTRIBUTE != 0,
        body,
        size,
    };
    if header.end() > limit {
        return Err(corrupt(
            offset,
            format!("node body of {size} bytes overruns its parent"),
        ));
    }
    if header.attribute && !header.leaf {
        return Err(corrupt(offset, "attribute flag on a group node"));
    }
    Ok(header)
}

/// Append the body of a leaf holding `value`.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    buf.push(value.kind().code());
    match value {
        Value::Bool(v) => buf.push(u8::from(*v)),
        Value::I8(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::U8(v) => buf.push(*v),
        Value::I16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::F32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::F64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        Value::String(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Bytes(b) => buf.extend_from_slice(b),
        Value::Array(a) => {
            buf.push(a.element_kind().code());
            buf.extend_from_slice(&a.to_le_bytes());
        }
    }
}

macro_rules! fixed {
    ($bytes:expr, $offset:expr, $ty:ty, $variant:ident) => {{
        const W: usize = std::mem::size_of::<$ty>();
        let bytes: [u8; W] = $bytes
            .try_into()
            .map_err(|_| corrupt($offset, concat!("bad width for ", stringify!($ty))))?;
        Value::$variant(<$ty>::from_le_bytes(bytes))
    }};
}

/// Decode a leaf body. `offset` is the body's position, for error reports.
pub fn decode_value(body: &[u8], offset: usize) -> CursorResult<Value> {
    let (&kind, rest) = body
        .split_first()
        .ok_or_else(|| corrupt(offset, "empty leaf"))?;
    let kind = ValueKind::from_code(kind)?;
    Ok(match kind {
        ValueKind::Bool => match rest {
            [0] => Value::Bool(false),
            [1] => Value::Bool(true),
            _ => return Err(corrupt(offset, "bad bool")),
        },
        ValueKind::I8 => fixed!(rest, offset, i8, I8),
        ValueKind::U8 => fixed!(rest, offset, u8, U8),
        ValueKind::I16 => fixed!(rest, offset, i16, I16),
        ValueKind::U16 => fixed!(rest, offset, u16, U16),
        ValueKind::I32 => fixed!(rest, offset, i32, I32),
        ValueKind::U32 => fixed!(rest, offset, u32, U32),
        ValueKind::I64 => fixed!(rest, offset, i64, I64),
        ValueKind::U64 => fixed!(rest, offset, u64, U64),
        ValueKind::F32 => fixed!(rest, offset, f32, F32),
        ValueKind::F64 => fixed!(rest, offset, f64, F64),
        ValueKind::String => Value::String(
            String::from_utf8(rest.to_vec())
                .map_err(|e| corrupt(offset, format!("string is not UTF-8: {e}")))?,
        ),
        ValueKind::Bytes => Value::Bytes(rest.to_vec()),
        ValueKind::Array => {
            let (&element, elements) = rest
                .split_first()
                .ok_or_else(|| corrupt(offset, "array without element kind"))?;
            let element = ValueKind::from_code(element)?;
            Value::Array(Array::from_le_bytes(element, elements)?)
        }
    })
}
