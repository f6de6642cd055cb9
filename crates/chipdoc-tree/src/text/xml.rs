use std::borrow::Cow;

use chipdoc_types::{FormatVersion, Tag, TagTable, TextEncoding, Value};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::FORMAT_VERSION_ATTR;
use crate::element::{Element, MAX_NESTING_DEPTH};
use crate::error::{CursorError, CursorResult};

/// Attribute holding the content of a `Data` leaf.
const DATA_ATTR: &str = "v";

fn malformed(reason: impl Into<String>) -> CursorError {
    CursorError::Malformed(reason.into())
}

fn encode_err(err: impl std::fmt::Display) -> CursorError {
    CursorError::Encode(err.to_string())
}

fn text_of(value: &Value) -> CursorResult<Cow<'_, str>> {
    value
        .as_key()
        .ok_or_else(|| CursorError::Encode(format!("{} value has no text form", value.kind())))
}

/// Serialize `root` as an XML document in the current format version.
pub(super) fn to_string(root: &Element, pretty: bool) -> CursorResult<String> {
    let table = TagTable::current();
    let mut writer = if pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;
    let version = FormatVersion::CURRENT.to_string();
    write_node(&mut writer, &table, root, Some(&version))?;
    String::from_utf8(writer.into_inner()).map_err(encode_err)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    table: &TagTable,
    element: &Element,
    version: Option<&str>,
) -> CursorResult<()> {
    let name = table
        .name(element.tag, TextEncoding::Xml)
        .ok_or(CursorError::Unrepresentable {
            tag: element.tag,
            version: table.version(),
        })?;
    let mut start = BytesStart::new(name);

    if element.is_data() {
        let value = element
            .value
            .as_ref()
            .ok_or_else(|| CursorError::Encode("data leaf without a value".into()))?;
        start.push_attribute((DATA_ATTR, text_of(value)?.as_ref()));
        return writer.write_event(Event::Empty(start)).map_err(encode_err);
    }

    if let Some(version) = version {
        start.push_attribute((FORMAT_VERSION_ATTR, version));
    }
    for (key, value) in &element.attributes {
        let key_name = table
            .name(*key, TextEncoding::Xml)
            .ok_or(CursorError::Unrepresentable {
                tag: *key,
                version: table.version(),
            })?;
        start.push_attribute((key_name, text_of(value)?.as_ref()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(encode_err);
    }
    writer.write_event(Event::Start(start)).map_err(encode_err)?;
    for child in &element.children {
        write_node(writer, table, child, None)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)
}

/// Parse an XML document. Returns the root element and the format version
/// declared on it; a root without `formatVersion` is a version 1 document.
pub(super) fn from_str(text: &str) -> CursorResult<(Element, FormatVersion)> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut parser = Parser::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                parser.check_depth()?;
                let element = parser.open(e)?;
                parser.stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = parser.open(e)?;
                if !element.is_data() {
                    parser.check_depth()?;
                }
                parser.attach(element)?;
            }
            Ok(Event::End(_)) => {
                let element = parser
                    .stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag"))?;
                parser.attach(element)?;
            }
            Ok(Event::Text(ref t)) if t.iter().all(u8::is_ascii_whitespace) => {}
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Ok(_) => {
                return Err(malformed(format!(
                    "unexpected character content at byte {}",
                    reader.buffer_position()
                )))
            }
            Err(e) => {
                return Err(malformed(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )))
            }
        }
    }

    if !parser.stack.is_empty() {
        return Err(malformed("unclosed elements at end of document"));
    }
    let root = parser.root.ok_or_else(|| malformed("empty document"))?;
    let version = parser
        .table
        .map(|t| t.version())
        .ok_or_else(|| malformed("empty document"))?;
    Ok((root, version))
}

#[derive(Default)]
struct Parser {
    table: Option<TagTable>,
    stack: Vec<Element>,
    root: Option<Element>,
}

impl Parser {
    fn check_depth(&self) -> CursorResult<()> {
        if self.stack.len() >= MAX_NESTING_DEPTH {
            return Err(malformed(format!(
                "elements nested deeper than {MAX_NESTING_DEPTH}"
            )));
        }
        Ok(())
    }

    fn open(&mut self, start: &BytesStart<'_>) -> CursorResult<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| malformed(e.to_string()))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(e.to_string()))?
                .into_owned();
            attrs.push((key, value));
        }

        let table = match self.table {
            Some(table) => table,
            None => {
                let version = match attrs.iter().find(|(k, _)| k == FORMAT_VERSION_ATTR) {
                    Some((_, v)) => v.parse::<FormatVersion>()?,
                    None => FormatVersion::LEGACY_V1,
                };
                let table = TagTable::for_version(version)?;
                self.table = Some(table);
                table
            }
        };

        let tag = table
            .from_name(&name, TextEncoding::Xml)
            .ok_or_else(|| malformed(format!("unknown element <{name}>")))?;
        if self.stack.is_empty() && self.root.is_none() && tag != Tag::Document {
            return Err(malformed(format!("root element is <{name}>, expected a document")));
        }

        if tag == Tag::Data {
            let value = attrs
                .into_iter()
                .find(|(k, _)| k == DATA_ATTR)
                .map(|(_, v)| v)
                .ok_or_else(|| malformed("data leaf without a value"))?;
            return Ok(Element::data(value));
        }

        let mut element = Element::new(tag);
        for (key, value) in attrs {
            if key == FORMAT_VERSION_ATTR && tag == Tag::Document {
                continue;
            }
            let key_tag = table
                .from_name(&key, TextEncoding::Xml)
                .ok_or_else(|| malformed(format!("unknown attribute {key} on <{name}>")))?;
            element.attributes.insert(key_tag, Value::String(value));
        }
        Ok(element)
    }

    fn attach(&mut self, element: Element) -> CursorResult<()> {
        match self.stack.last_mut() {
            Some(parent) if parent.is_data() => Err(malformed("data leaf has children")),
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None if self.root.is_some() => Err(malformed("more than one root element")),
            None => {
                self.root = Some(element);
                Ok(())
            }
        }
    }
}
