use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Declared type of a leaf value. The discriminant is the byte written in
/// front of every binary leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 1,
    I8 = 2,
    U8 = 3,
    I16 = 4,
    U16 = 5,
    I32 = 6,
    U32 = 7,
    I64 = 8,
    U64 = 9,
    F32 = 10,
    F64 = 11,
    String = 12,
    Bytes = 13,
    Array = 14,
}

impl ValueKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        Ok(match code {
            1 => Self::Bool,
            2 => Self::I8,
            3 => Self::U8,
            4 => Self::I16,
            5 => Self::U16,
            6 => Self::I32,
            7 => Self::U32,
            8 => Self::I64,
            9 => Self::U64,
            10 => Self::F32,
            11 => Self::F64,
            12 => Self::String,
            13 => Self::Bytes,
            14 => Self::Array,
            other => return Err(TypeError::UnknownValueKind(other)),
        })
    }

    /// Encoded width of a fixed-size scalar, `None` for variable-length kinds.
    pub fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::String | Self::Bytes | Self::Array => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

/// Homogeneous array of fixed-width scalars. Byte arrays are [`Value::Bytes`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Array {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! le_decode {
    ($bytes:expr, $ty:ty, $variant:ident) => {{
        const W: usize = std::mem::size_of::<$ty>();
        Array::$variant(
            $bytes
                .chunks_exact(W)
                .map(|c| {
                    let mut buf = [0u8; W];
                    buf.copy_from_slice(c);
                    <$ty>::from_le_bytes(buf)
                })
                .collect(),
        )
    }};
}

impl Array {
    pub fn element_kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::I8(_) => ValueKind::I8,
            Self::I16(_) => ValueKind::I16,
            Self::U16(_) => ValueKind::U16,
            Self::I32(_) => ValueKind::I32,
            Self::U32(_) => ValueKind::U32,
            Self::I64(_) => ValueKind::I64,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements as fixed-width little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(v) => v.iter().map(|&b| u8::from(b)).collect(),
            Self::I8(v) => v.iter().map(|&x| x as u8).collect(),
            Self::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Rebuild an array of `kind` from little-endian element bytes.
    pub fn from_le_bytes(kind: ValueKind, bytes: &[u8]) -> Result<Self, TypeError> {
        let malformed = || TypeError::MalformedArray {
            kind: kind.to_string(),
            len: bytes.len(),
        };
        let width = match kind {
            ValueKind::U8 | ValueKind::String | ValueKind::Bytes | ValueKind::Array => {
                return Err(malformed())
            }
            scalar => scalar.width().ok_or_else(malformed)?,
        };
        if bytes.len() % width != 0 {
            return Err(malformed());
        }
        Ok(match kind {
            ValueKind::Bool => Array::Bool(bytes.iter().map(|&b| b != 0).collect()),
            ValueKind::I8 => Array::I8(bytes.iter().map(|&b| b as i8).collect()),
            ValueKind::I16 => le_decode!(bytes, i16, I16),
            ValueKind::U16 => le_decode!(bytes, u16, U16),
            ValueKind::I32 => le_decode!(bytes, i32, I32),
            ValueKind::U32 => le_decode!(bytes, u32, U32),
            ValueKind::I64 => le_decode!(bytes, i64, I64),
            ValueKind::U64 => le_decode!(bytes, u64, U64),
            ValueKind::F32 => le_decode!(bytes, f32, F32),
            _ => le_decode!(bytes, f64, F64),
        })
    }
}

/// Payload of a leaf node or attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Array),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::I8(_) => ValueKind::I8,
            Self::U8(_) => ValueKind::U8,
            Self::I16(_) => ValueKind::I16,
            Self::U16(_) => ValueKind::U16,
            Self::I32(_) => ValueKind::I32,
            Self::U32(_) => ValueKind::U32,
            Self::I64(_) => ValueKind::I64,
            Self::U64(_) => ValueKind::U64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// The value rendered as a lookup key, as used by keyed group lookup.
    /// Blobs and arrays have no key form.
    pub fn as_key(&self) -> Option<Cow<'_, str>> {
        Some(match self {
            Self::String(s) => Cow::Borrowed(s.as_str()),
            Self::Bool(v) => Cow::Owned(v.to_string()),
            Self::I8(v) => Cow::Owned(v.to_string()),
            Self::U8(v) => Cow::Owned(v.to_string()),
            Self::I16(v) => Cow::Owned(v.to_string()),
            Self::U16(v) => Cow::Owned(v.to_string()),
            Self::I32(v) => Cow::Owned(v.to_string()),
            Self::U32(v) => Cow::Owned(v.to_string()),
            Self::I64(v) => Cow::Owned(v.to_string()),
            Self::U64(v) => Cow::Owned(v.to_string()),
            Self::F32(v) => Cow::Owned(v.to_string()),
            Self::F64(v) => Cow::Owned(v.to_string()),
            Self::Bytes(_) | Self::Array(_) => return None,
        })
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    Array => Array,
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::Array(Array::$variant(v))
                }
            }
        )*
    };
}

impl_from_vec! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}
