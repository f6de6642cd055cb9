//! JsonML-style encoding: every group is `[name, {attributes}, items...]`
//! and every `Data` leaf is a bare string item. The attribute object is
//! omitted when a group has none.

use chipdoc_types::{FormatVersion, Tag, TagTable, TextEncoding, Value};
use serde_json::{Map, Value as Json};

use super::FORMAT_VERSION_ATTR;
use crate::element::Element;
use crate::error::{CursorError, CursorResult};

fn malformed(reason: impl Into<String>) -> CursorError {
    CursorError::Malformed(reason.into())
}

fn name_of(table: &TagTable, tag: Tag) -> CursorResult<&'static str> {
    table
        .name(tag, TextEncoding::Json)
        .ok_or(CursorError::Unrepresentable {
            tag,
            version: table.version(),
        })
}

fn text_of(value: &Value) -> CursorResult<String> {
    value
        .as_key()
        .map(|k| k.into_owned())
        .ok_or_else(|| CursorError::Encode(format!("{} value has no text form", value.kind())))
}

pub(super) fn to_string(root: &Element, pretty: bool) -> CursorResult<String> {
    let table = TagTable::current();
    let json = to_json(&table, root, Some(FormatVersion::CURRENT))?;
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    text.map_err(|e| CursorError::Encode(e.to_string()))
}

fn to_json(table: &TagTable, element: &Element, version: Option<FormatVersion>) -> CursorResult<Json> {
    if element.is_data() {
        let value = element
            .value
            .as_ref()
            .ok_or_else(|| CursorError::Encode("data leaf without a value".into()))?;
        return Ok(Json::String(text_of(value)?));
    }

    let mut items = vec![Json::String(name_of(table, element.tag)?.to_string())];
    let mut attrs = Map::new();
    if let Some(version) = version {
        attrs.insert(FORMAT_VERSION_ATTR.to_string(), Json::String(version.to_string()));
    }
    for (key, value) in &element.attributes {
        attrs.insert(name_of(table, *key)?.to_string(), Json::String(text_of(value)?));
    }
    if !attrs.is_empty() {
        items.push(Json::Object(attrs));
    }
    for child in &element.children {
        items.push(to_json(table, child, None)?);
    }
    Ok(Json::Array(items))
}

/// Parse a JSON document. A root without `formatVersion` is a version 1
/// document.
pub(super) fn from_str(text: &str) -> CursorResult<(Element, FormatVersion)> {
    let json: Json = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let Json::Array(items) = json else {
        return Err(malformed("root is not an element array"));
    };

    let version = match items.get(1) {
        Some(Json::Object(attrs)) => match attrs.get(FORMAT_VERSION_ATTR) {
            Some(Json::String(v)) => v.parse::<FormatVersion>()?,
            Some(_) => return Err(malformed("formatVersion is not a string")),
            None => FormatVersion::LEGACY_V1,
        },
        _ => FormatVersion::LEGACY_V1,
    };
    let table = TagTable::for_version(version)?;

    let root = from_items(&table, items, true)?;
    if root.tag != Tag::Document {
        return Err(malformed(format!("root element is {}, expected a document", root.tag)));
    }
    Ok((root, version))
}

fn from_items(table: &TagTable, items: Vec<Json>, is_root: bool) -> CursorResult<Element> {
    let mut items = items.into_iter().peekable();
    let name = match items.next() {
        Some(Json::String(name)) => name,
        _ => return Err(malformed("element array does not start with a name")),
    };
    let tag = table
        .from_name(&name, TextEncoding::Json)
        .ok_or_else(|| malformed(format!("unknown element {name:?}")))?;
    if tag == Tag::Data {
        return Err(malformed("data leaves must be bare strings"));
    }

    let mut element = Element::new(tag);
    if let Some(Json::Object(_)) = items.peek() {
        if let Some(Json::Object(attrs)) = items.next() {
            for (key, value) in attrs {
                if is_root && key == FORMAT_VERSION_ATTR {
                    continue;
                }
                let key_tag = table
                    .from_name(&key, TextEncoding::Json)
                    .ok_or_else(|| malformed(format!("unknown attribute {key:?} on {name:?}")))?;
                let Json::String(value) = value else {
                    return Err(malformed(format!("attribute {key:?} is not a string")));
                };
                element.attributes.insert(key_tag, Value::String(value));
            }
        }
    }

    for item in items {
        let child = match item {
            Json::String(s) => Element::data(s),
            Json::Array(inner) => from_items(table, inner, false)?,
            other => return Err(malformed(format!("unexpected item {other} in {name:?}"))),
        };
        element.children.push(child);
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Element {
        Element::new(Tag::Document)
            .with_attribute(Tag::Comment, "line one\nline \"two\"")
            .with_child(
                Element::new(Tag::Chips).with_child(
                    Element::new(Tag::Chip)
                        .with_attribute(Tag::Type, "Adder")
                        .with_data("7")
                        .with_child(Element::new(Tag::Parameters)),
                ),
            )
    }

    #[test]
    fn roundtrip() {
        for pretty in [true, false] {
            let text = to_string(&sample(), pretty).unwrap();
            let (root, version) = from_str(&text).unwrap();
            assert_eq!(version, FormatVersion::CURRENT);
            assert_eq!(root, sample());
        }
    }

    #[test]
    fn layout() {
        let text = to_string(&sample(), false).unwrap();
        let json: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json,
            json!([
                "document",
                {"formatVersion": "2.0.0.0", "comment": "line one\nline \"two\""},
                ["chips", ["chip", {"type": "Adder"}, "7", ["parameters"]]]
            ])
        );
    }

    #[test]
    fn legacy_names() {
        let text = r#"["document", ["links", ["link", {"source": "1"}]]]"#;
        let (root, version) = from_str(text).unwrap();
        assert_eq!(version, FormatVersion::LEGACY_V1);
        assert_eq!(root.children[0].tag, Tag::Connections);
        assert_eq!(
            root.children[0].children[0].attribute(Tag::Source),
            Some(&Value::from("1"))
        );
    }

    #[test]
    fn rejects_bad_shapes() {
        for text in [
            "{}",
            "[]",
            r#"["chips"]"#,
            r#"["document", {"formatVersion": "2.0.0.0"}, 5]"#,
            r#"["document", {"formatVersion": "2.0.0.0", "bogus": "x"}]"#,
            r#"["document", {"formatVersion": "2.0.0.0"}, ["chips", {"type": 3}]]"#,
            r#"["document", {"formatVersion": "2.0.0.0"}"#,
        ] {
            assert!(from_str(text).is_err(), "{text}");
        }
    }
}
