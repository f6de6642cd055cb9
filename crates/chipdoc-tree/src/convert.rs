//! Typed reads from tree values.
//!
//! The binary back end hands back values with their declared type; the text
//! back ends hand back strings. [`FromValue`] accepts either, so a chip's
//! `load` reads the same way from every back end.

use std::str::FromStr;

use chipdoc_types::{Array, Value, ValueKind};

use crate::envelope;
use crate::error::{CursorError, CursorResult};
use crate::text::RAW_ARRAY_MARKER;

/// Conversion out of a tree [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> CursorResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> CursorResult<Self> {
        Ok(value)
    }
}

fn wrong_type(expected: ValueKind, found: &Value) -> CursorError {
    CursorError::WrongType {
        expected,
        found: found.kind(),
    }
}

fn parse_text<T: FromStr>(text: &str, expected: ValueKind) -> CursorResult<T> {
    text.trim().parse().map_err(|_| CursorError::Parse {
        expected,
        text: text.to_string(),
    })
}

fn integer(value: &Value) -> Option<i128> {
    Some(match *value {
        Value::I8(v) => v.into(),
        Value::U8(v) => v.into(),
        Value::I16(v) => v.into(),
        Value::U16(v) => v.into(),
        Value::I32(v) => v.into(),
        Value::U32(v) => v.into(),
        Value::I64(v) => v.into(),
        Value::U64(v) => v.into(),
        _ => return None,
    })
}

// Integers also accept any other integer variant whose value fits.
macro_rules! integer_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> CursorResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::String(s) => parse_text(&s, ValueKind::$variant),
                        other => integer(&other)
                            .and_then(|n| <$ty>::try_from(n).ok())
                            .ok_or_else(|| wrong_type(ValueKind::$variant, &other)),
                    }
                }
            }
        )*
    };
}

integer_from_value! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
}

impl FromValue for bool {
    fn from_value(value: Value) -> CursorResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::String(s) => match s.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(CursorError::Parse {
                    expected: ValueKind::Bool,
                    text: s,
                }),
            },
            other => Err(wrong_type(ValueKind::Bool, &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> CursorResult<Self> {
        match value {
            Value::F32(v) => Ok(v),
            Value::String(s) => parse_text(&s, ValueKind::F32),
            other => Err(wrong_type(ValueKind::F32, &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> CursorResult<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(v.into()),
            Value::String(s) => parse_text(&s, ValueKind::F64),
            other => Err(wrong_type(ValueKind::F64, &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> CursorResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => other
                .as_key()
                .map(|key| key.into_owned())
                .ok_or_else(|| wrong_type(ValueKind::String, &other)),
        }
    }
}

/// Blobs come back as [`Value::Bytes`] from binary documents and as an
/// envelope string from text documents.
impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> CursorResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::String(s) => Ok(envelope::decode(&s)?),
            other => Err(wrong_type(ValueKind::Bytes, &other)),
        }
    }
}

/// Scalar types that can be array elements.
pub trait ArrayElement: FromStr + Sized {
    const KIND: ValueKind;

    fn from_array(array: Array) -> Option<Vec<Self>>;
}

macro_rules! array_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ArrayElement for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_array(array: Array) -> Option<Vec<Self>> {
                    match array {
                        Array::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl FromValue for Vec<$ty> {
                fn from_value(value: Value) -> CursorResult<Self> {
                    match value {
                        Value::Array(array) => {
                            let found = array.element_kind();
                            <$ty>::from_array(array).ok_or(CursorError::WrongType {
                                expected: ValueKind::$variant,
                                found,
                            })
                        }
                        Value::String(s) => parse_array(&s),
                        other => Err(wrong_type(ValueKind::Array, &other)),
                    }
                }
            }
        )*
    };
}

array_element! {
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

/// Parse the text form of an array: space-separated elements, or
/// [`RAW_ARRAY_MARKER`] followed by an envelope of little-endian elements.
pub fn parse_array<T: ArrayElement>(text: &str) -> CursorResult<Vec<T>> {
    if let Some(raw) = text.strip_prefix(RAW_ARRAY_MARKER) {
        let bytes = envelope::decode(raw)?;
        let array = Array::from_le_bytes(T::KIND, &bytes)?;
        let found = array.element_kind();
        return T::from_array(array).ok_or(CursorError::WrongType {
            expected: T::KIND,
            found,
        });
    }
    text.split_whitespace()
        .map(|item| parse_text(item, T::KIND))
        .collect()
}
