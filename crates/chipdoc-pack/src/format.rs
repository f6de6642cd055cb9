use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chipdoc_tree::text::detect_encoding;
use chipdoc_tree::{CursorResult, TextLoader, TreeReader};
use chipdoc_types::{FormatVersion, Tag, TextEncoding, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpenOptions;
use crate::error::{PackError, PackResult};
use crate::header::MAGIC;
use crate::loader::BinaryLoader;

/// The three on-disk representations of a chip document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Binary,
    Xml,
    Json,
}

impl Format {
    /// Sniff the format from the leading bytes: the binary magic, or the
    /// first significant character of a text document.
    pub fn detect(bytes: &[u8]) -> PackResult<Self> {
        if bytes.starts_with(&MAGIC) {
            return Ok(Self::Binary);
        }
        let text = std::str::from_utf8(bytes).map_err(|_| PackError::UnknownFormat)?;
        match detect_encoding(text) {
            Some(TextEncoding::Xml) => Ok(Self::Xml),
            Some(TextEncoding::Json) => Ok(Self::Json),
            None => Err(PackError::UnknownFormat),
        }
    }

    /// The text encoding, or `None` for binary.
    pub fn encoding(self) -> Option<TextEncoding> {
        match self {
            Self::Binary => None,
            Self::Xml => Some(TextEncoding::Xml),
            Self::Json => Some(TextEncoding::Json),
        }
    }

    /// Guess from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            "chip" | "bin" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Xml => "xml",
            Self::Json => "json",
        })
    }
}

impl FromStr for Format {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(Self::Binary),
            "xml" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            _ => Err(PackError::UnknownFormat),
        }
    }
}

/// A loader for whichever format the input turns out to be.
#[derive(Debug)]
pub enum AnyLoader {
    Binary(BinaryLoader),
    Text(TextLoader),
}

impl AnyLoader {
    pub fn open_memory(bytes: &[u8], options: &OpenOptions) -> PackResult<Self> {
        let format = Format::detect(bytes)?;
        debug!(%format, len = bytes.len(), "opening document");
        match format.encoding() {
            None => Ok(Self::Binary(BinaryLoader::open_memory(bytes, options)?)),
            Some(encoding) => {
                let text = std::str::from_utf8(bytes).map_err(|_| PackError::UnknownFormat)?;
                Ok(Self::Text(TextLoader::open_str(text, encoding)?))
            }
        }
    }

    pub fn open_file(path: impl AsRef<Path>, options: &OpenOptions) -> PackResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::open_memory(&bytes, options)
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Binary(_) => Format::Binary,
            Self::Text(loader) => match loader.encoding() {
                TextEncoding::Xml => Format::Xml,
                TextEncoding::Json => Format::Json,
            },
        }
    }

    pub fn version(&self) -> FormatVersion {
        match self {
            Self::Binary(loader) => loader.version(),
            Self::Text(loader) => loader.version(),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $loader:ident => $body:expr) => {
        match $self {
            AnyLoader::Binary($loader) => $body,
            AnyLoader::Text($loader) => $body,
        }
    };
}

impl TreeReader for AnyLoader {
    fn enter_group(&mut self, tag: Tag) -> CursorResult<()> {
        dispatch!(self, l => l.enter_group(tag))
    }

    fn enter_group_keyed(&mut self, tag: Tag, key: Tag, value: &str) -> CursorResult<()> {
        dispatch!(self, l => l.enter_group_keyed(tag, key, value))
    }

    fn leave_group(&mut self, tag: Tag) -> CursorResult<()> {
        dispatch!(self, l => l.leave_group(tag))
    }

    fn verify_group(&self, tag: Tag) -> bool {
        dispatch!(self, l => l.verify_group(tag))
    }

    fn current_tag(&self) -> Option<Tag> {
        dispatch!(self, l => l.current_tag())
    }

    fn depth(&self) -> usize {
        dispatch!(self, l => l.depth())
    }

    fn read_data(&mut self) -> CursorResult<Value> {
        dispatch!(self, l => l.read_data())
    }

    fn read_attribute(&mut self, key: Tag) -> CursorResult<Value> {
        dispatch!(self, l => l.read_attribute(key))
    }

    fn children(&mut self) -> CursorResult<Vec<Tag>> {
        dispatch!(self, l => l.children())
    }

    fn attribute_keys(&mut self) -> CursorResult<Vec<Tag>> {
        dispatch!(self, l => l.attribute_keys())
    }
}
