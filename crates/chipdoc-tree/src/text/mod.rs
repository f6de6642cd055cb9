//! XML and JSON back ends.
//!
//! Both encodings keep every value as a string. Blobs are embedded through
//! the raw-blob [`envelope`](crate::envelope); arrays are written as
//! space-separated elements, or as [`RAW_ARRAY_MARKER`] plus an envelope of
//! their little-endian bytes once they exceed
//! [`TextOptions::raw_array_threshold`] elements.

mod json;
mod loader;
mod saver;
mod xml;

use std::fmt::Display;

use chipdoc_crypto::CompressionLevel;
use chipdoc_types::{Array, TextEncoding, Value};
use serde::{Deserialize, Serialize};

use crate::envelope;
use crate::error::CursorResult;

pub use loader::TextLoader;
pub use saver::TextSaver;

/// Prefix marking an array stored as an envelope of raw bytes.
pub const RAW_ARRAY_MARKER: char = '#';

/// Name of the root attribute carrying the format version.
pub const FORMAT_VERSION_ATTR: &str = "formatVersion";

/// Options for the text savers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Compression applied inside blob envelopes.
    pub blob_compression: CompressionLevel,
    /// Arrays longer than this are written as a raw envelope.
    pub raw_array_threshold: usize,
    /// Indent the output.
    pub pretty: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            blob_compression: CompressionLevel::Default,
            raw_array_threshold: 16,
            pretty: true,
        }
    }
}

/// Guess the encoding of a text document from its first significant character.
pub fn detect_encoding(text: &str) -> Option<TextEncoding> {
    match text.trim_start_matches('\u{feff}').trim_start().chars().next()? {
        '<' => Some(TextEncoding::Xml),
        '[' => Some(TextEncoding::Json),
        _ => None,
    }
}

fn join<T: Display>(items: &[T]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&item.to_string());
    }
    out
}

fn array_to_text(array: &Array) -> String {
    match array {
        Array::Bool(v) => join(v),
        Array::I8(v) => join(v),
        Array::I16(v) => join(v),
        Array::U16(v) => join(v),
        Array::I32(v) => join(v),
        Array::U32(v) => join(v),
        Array::I64(v) => join(v),
        Array::U64(v) => join(v),
        Array::F32(v) => join(v),
        Array::F64(v) => join(v),
    }
}

/// Render a value in its text form.
pub fn value_to_text(value: &Value, options: &TextOptions) -> CursorResult<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Bytes(bytes) => envelope::encode(bytes, options.blob_compression)?,
        Value::Array(array) if array.len() > options.raw_array_threshold => {
            let raw = envelope::encode(&array.to_le_bytes(), options.blob_compression)?;
            format!("{RAW_ARRAY_MARKER}{raw}")
        }
        Value::Array(array) => array_to_text(array),
        // every remaining variant is a scalar with a key form
        scalar => scalar.as_key().map(|k| k.into_owned()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FromValue;

    #[test]
    fn scalars_render_plainly() {
        let opts = TextOptions::default();
        assert_eq!(value_to_text(&Value::Bool(true), &opts).unwrap(), "true");
        assert_eq!(value_to_text(&Value::I8(-5), &opts).unwrap(), "-5");
        assert_eq!(value_to_text(&Value::F64(0.5), &opts).unwrap(), "0.5");
    }

    #[test]
    fn short_array_is_space_separated() {
        let opts = TextOptions::default();
        let text = value_to_text(&Value::from(vec![1i32, 2, 3]), &opts).unwrap();
        assert_eq!(text, "1 2 3");
    }

    #[test]
    fn long_array_uses_raw_envelope() {
        let opts = TextOptions::default();
        let values: Vec<u32> = (0..17).collect();
        let text = value_to_text(&Value::from(values.clone()), &opts).unwrap();
        assert!(text.starts_with(RAW_ARRAY_MARKER));
        assert_eq!(Vec::<u32>::from_value(Value::String(text)).unwrap(), values);
    }

    #[test]
    fn threshold_is_configurable() {
        let opts = TextOptions {
            raw_array_threshold: 2,
            ..TextOptions::default()
        };
        let text = value_to_text(&Value::from(vec![true, false, true]), &opts).unwrap();
        assert!(text.starts_with(RAW_ARRAY_MARKER));
        assert_eq!(
            Vec::<bool>::from_value(Value::String(text)).unwrap(),
            vec![true, false, true]
        );
    }

    #[test]
    fn detect() {
        assert_eq!(detect_encoding("  <?xml"), Some(TextEncoding::Xml));
        assert_eq!(detect_encoding("\n[\"document\""), Some(TextEncoding::Json));
        assert_eq!(detect_encoding("CHIP"), None);
        assert_eq!(detect_encoding(""), None);
    }
}
