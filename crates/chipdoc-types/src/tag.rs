use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::version::FormatVersion;

/// Kind of a node in a chip document tree.
///
/// The enumeration is closed and stable across format versions; only the
/// encoded representation (binary code, text name) changes between versions,
/// and that mapping lives in [`TagTable`]. The discriminant is the current
/// binary code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tag {
    Document = 1,
    Version = 2,
    Chips = 3,
    Chip = 4,
    Connections = 5,
    Connection = 6,
    Data = 7,
    Content = 8,
    Comment = 9,
    Inheritance = 10,
    Parameters = 11,
    Parameter = 12,
    Id = 13,
    Type = 14,
    Name = 15,
    Types = 16,
    Count = 17,
    Source = 18,
    Target = 19,
    Children = 20,
}

impl Tag {
    /// Every tag, in code order.
    pub const ALL: [Tag; 20] = [
        Tag::Document,
        Tag::Version,
        Tag::Chips,
        Tag::Chip,
        Tag::Connections,
        Tag::Connection,
        Tag::Data,
        Tag::Content,
        Tag::Comment,
        Tag::Inheritance,
        Tag::Parameters,
        Tag::Parameter,
        Tag::Id,
        Tag::Type,
        Tag::Name,
        Tag::Types,
        Tag::Count,
        Tag::Source,
        Tag::Target,
        Tag::Children,
    ];

    /// Binary code in the current format version.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Element name used by the XML encoding.
    pub fn xml_name(self) -> &'static str {
        match self {
            Tag::Document => "Document",
            Tag::Version => "Version",
            Tag::Chips => "Chips",
            Tag::Chip => "Chip",
            Tag::Connections => "Connections",
            Tag::Connection => "Connection",
            Tag::Data => "Data",
            Tag::Content => "Content",
            Tag::Comment => "Comment",
            Tag::Inheritance => "Inheritance",
            Tag::Parameters => "Parameters",
            Tag::Parameter => "Parameter",
            Tag::Id => "Id",
            Tag::Type => "Type",
            Tag::Name => "Name",
            Tag::Types => "Types",
            Tag::Count => "Count",
            Tag::Source => "Source",
            Tag::Target => "Target",
            Tag::Children => "Children",
        }
    }

    /// Key used by the JSON encoding.
    pub fn json_name(self) -> &'static str {
        match self {
            Tag::Document => "document",
            Tag::Version => "version",
            Tag::Chips => "chips",
            Tag::Chip => "chip",
            Tag::Connections => "connections",
            Tag::Connection => "connection",
            Tag::Data => "data",
            Tag::Content => "content",
            Tag::Comment => "comment",
            Tag::Inheritance => "inheritance",
            Tag::Parameters => "parameters",
            Tag::Parameter => "parameter",
            Tag::Id => "id",
            Tag::Type => "type",
            Tag::Name => "name",
            Tag::Types => "types",
            Tag::Count => "count",
            Tag::Source => "source",
            Tag::Target => "target",
            Tag::Children => "children",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_name())
    }
}

/// The two structured-text encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Xml,
    Json,
}

/// Maps tags to and from their encoded representation for one format version.
///
/// Version 1 documents swapped the codes of `Content` and `Comment`, lacked
/// the inheritance/parameter/type-registry tags, and named connections
/// `Links`/`Link` in the text encodings. `Document` and `Version` keep the
/// same representation in every version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagTable {
    version: FormatVersion,
}

impl TagTable {
    pub fn current() -> Self {
        Self {
            version: FormatVersion::CURRENT,
        }
    }

    pub fn for_version(version: FormatVersion) -> Result<Self, TypeError> {
        if !version.is_supported() {
            return Err(TypeError::UnsupportedVersion(version));
        }
        Ok(Self { version })
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    fn is_legacy(&self) -> bool {
        self.version.major() == 1
    }

    /// Whether the tag can be represented in this version at all.
    pub fn contains(&self, tag: Tag) -> bool {
        !self.is_legacy()
            || !matches!(
                tag,
                Tag::Inheritance | Tag::Parameters | Tag::Parameter | Tag::Types | Tag::Count
            )
    }

    /// Binary code of `tag`, or `None` if the version cannot represent it.
    pub fn code(&self, tag: Tag) -> Option<u8> {
        if !self.contains(tag) {
            return None;
        }
        if self.is_legacy() {
            return Some(match tag {
                Tag::Content => Tag::Comment.code(),
                Tag::Comment => Tag::Content.code(),
                other => other.code(),
            });
        }
        Some(tag.code())
    }

    /// Decode a binary code into the current enumeration.
    pub fn from_code(&self, code: u8) -> Option<Tag> {
        let current = Tag::ALL.iter().copied().find(|t| t.code() == code)?;
        if self.is_legacy() {
            let mapped = match current {
                Tag::Content => Tag::Comment,
                Tag::Comment => Tag::Content,
                other => other,
            };
            return self.contains(mapped).then_some(mapped);
        }
        Some(current)
    }

    /// Text name of `tag` in the given encoding.
    pub fn name(&self, tag: Tag, encoding: TextEncoding) -> Option<&'static str> {
        if !self.contains(tag) {
            return None;
        }
        if self.is_legacy() {
            match (tag, encoding) {
                (Tag::Connections, TextEncoding::Xml) => return Some("Links"),
                (Tag::Connection, TextEncoding::Xml) => return Some("Link"),
                (Tag::Connections, TextEncoding::Json) => return Some("links"),
                (Tag::Connection, TextEncoding::Json) => return Some("link"),
                _ => {}
            }
        }
        Some(match encoding {
            TextEncoding::Xml => tag.xml_name(),
            TextEncoding::Json => tag.json_name(),
        })
    }

    /// Decode a text name into the current enumeration.
    pub fn from_name(&self, name: &str, encoding: TextEncoding) -> Option<Tag> {
        Tag::ALL
            .iter()
            .copied()
            .find(|&tag| self.name(tag, encoding) == Some(name))
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self::current()
    }
}
