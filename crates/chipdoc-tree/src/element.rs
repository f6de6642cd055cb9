use std::collections::BTreeMap;

use chipdoc_types::{Tag, Value};

use crate::cursor::{TreeReader, TreeWriter};
use crate::error::{CursorError, CursorResult};

/// Deepest group nesting an [`Element`] tree may have, counting the root as 1.
/// Rendering and dropping a tree recurse once per level.
pub const MAX_NESTING_DEPTH: usize = 128;

/// In-memory tree node shared by the text back ends.
///
/// A `Data` element is a leaf carrying `value`; every other element is a
/// group with attributes and ordered children. Attributes are kept sorted by
/// tag so every encoding writes them in the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub attributes: BTreeMap<Tag, Value>,
    pub value: Option<Value>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: BTreeMap::new(),
            value: None,
            children: Vec::new(),
        }
    }

    /// A `Data` leaf.
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(Tag::Data)
        }
    }

    pub fn with_attribute(mut self, key: Tag, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_data(self, value: impl Into<Value>) -> Self {
        self.with_child(Element::data(value))
    }

    pub fn is_data(&self) -> bool {
        self.tag == Tag::Data
    }

    pub fn is_group(&self, tag: Tag) -> bool {
        self.tag == tag && !self.is_data()
    }

    pub fn attribute(&self, key: Tag) -> Option<&Value> {
        self.attributes.get(&key)
    }

    /// First `Data` leaf among the children.
    pub fn first_data(&self) -> Option<&Value> {
        self.children
            .iter()
            .find(|c| c.is_data())
            .and_then(|c| c.value.as_ref())
    }

    /// Attribute `key`, or the content of the first child group tagged `key`.
    pub fn lookup(&self, key: Tag) -> Option<&Value> {
        self.attribute(key).or_else(|| {
            self.children
                .iter()
                .find(|c| c.is_group(key))
                .and_then(Element::first_data)
        })
    }

    /// Number of elements in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Element::node_count).sum::<usize>()
    }
}

/// Read the reader's open group into an [`Element`], descending into every
/// child group. Call it right after entering the group: children already
/// visited through the cursor are not revisited.
///
/// Fails with [`CursorError::Malformed`] on trees nested deeper than
/// [`MAX_NESTING_DEPTH`].
pub fn read_element<R: TreeReader>(reader: &mut R) -> CursorResult<Element> {
    read_element_at(reader, 1)
}

fn read_element_at<R: TreeReader>(reader: &mut R, depth: usize) -> CursorResult<Element> {
    let tag = reader.current_tag().ok_or(CursorError::StackEmpty)?;
    let mut element = Element::new(tag);
    for key in reader.attribute_keys()? {
        let value = reader.read_attribute(key)?;
        element.attributes.insert(key, value);
    }
    for child in reader.children()? {
        if child == Tag::Data {
            element.children.push(Element::data(reader.read_data()?));
        } else {
            if depth >= MAX_NESTING_DEPTH {
                return Err(CursorError::Malformed(format!(
                    "groups nested deeper than {MAX_NESTING_DEPTH}"
                )));
            }
            reader.enter_group(child)?;
            element.children.push(read_element_at(reader, depth + 1)?);
            reader.leave_group(child)?;
        }
    }
    Ok(element)
}

/// Write `element` as a new child group of the writer's open group.
pub fn write_element<W: TreeWriter>(writer: &mut W, element: &Element) -> CursorResult<()> {
    if element.is_data() {
        if let Some(value) = &element.value {
            writer.write_data(value.clone())?;
        }
        return Ok(());
    }
    writer.push_group(element.tag)?;
    for (key, value) in &element.attributes {
        writer.write_attribute(*key, value.clone())?;
    }
    write_children(writer, element)?;
    writer.pop_group(element.tag)
}

/// Write the children of `element` into the writer's open group.
pub fn write_children<W: TreeWriter>(writer: &mut W, element: &Element) -> CursorResult<()> {
    for child in &element.children {
        write_element(writer, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip() -> Element {
        Element::new(Tag::Chip)
            .with_attribute(Tag::Type, "Adder")
            .with_child(Element::new(Tag::Name).with_data("sum"))
            .with_data(3u32)
    }

    #[test]
    fn lookup_prefers_attribute() {
        let el = chip().with_child(Element::new(Tag::Type).with_data("Other"));
        assert_eq!(el.lookup(Tag::Type), Some(&Value::from("Adder")));
    }

    #[test]
    fn lookup_falls_back_to_field() {
        assert_eq!(chip().lookup(Tag::Name), Some(&Value::from("sum")));
        assert_eq!(chip().lookup(Tag::Id), None);
    }

    #[test]
    fn first_data_skips_groups() {
        assert_eq!(chip().first_data(), Some(&Value::U32(3)));
    }

    #[test]
    fn node_count() {
        assert_eq!(chip().node_count(), 4);
    }
}
