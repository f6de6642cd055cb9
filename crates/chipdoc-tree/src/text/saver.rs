use std::path::Path;

use chipdoc_types::{Tag, TextEncoding, Value};
use tracing::{debug, info};

use super::{json, value_to_text, xml, TextOptions};
use crate::cursor::{SubtreeWriter, TreeWriter};
use crate::element::Element;
use crate::error::{CursorError, CursorResult};

/// Builds a text document in memory and serializes it on save.
///
/// Values are rendered to their text form as they are written, so a value
/// that cannot be encoded fails at the write call rather than at save.
#[derive(Debug)]
pub struct TextSaver {
    stack: Vec<Element>,
    options: TextOptions,
    encoding: TextEncoding,
}

impl TextSaver {
    pub fn new(encoding: TextEncoding, options: TextOptions) -> Self {
        Self {
            stack: vec![Element::new(Tag::Document)],
            options,
            encoding,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn options(&self) -> &TextOptions {
        &self.options
    }

    fn top(&mut self) -> CursorResult<&mut Element> {
        self.stack.last_mut().ok_or(CursorError::StackEmpty)
    }

    fn finish(mut self) -> CursorResult<(Element, TextOptions, TextEncoding)> {
        if self.stack.len() != 1 {
            return Err(CursorError::Unbalanced(self.stack.len().saturating_sub(1)));
        }
        let root = self.stack.pop().ok_or(CursorError::StackEmpty)?;
        Ok((root, self.options, self.encoding))
    }

    /// Close the document and serialize it.
    pub fn save_to_string(self) -> CursorResult<String> {
        let (root, options, encoding) = self.finish()?;
        let text = match encoding {
            TextEncoding::Xml => xml::to_string(&root, options.pretty)?,
            TextEncoding::Json => json::to_string(&root, options.pretty)?,
        };
        debug!(?encoding, nodes = root.node_count(), len = text.len(), "text document serialized");
        Ok(text)
    }

    pub fn save_to_file(self, path: impl AsRef<Path>) -> CursorResult<()> {
        let path = path.as_ref();
        let text = self.save_to_string()?;
        std::fs::write(path, &text)?;
        info!(path = %path.display(), bytes = text.len(), "text document saved");
        Ok(())
    }
}

impl TreeWriter for TextSaver {
    fn push_group(&mut self, tag: Tag) -> CursorResult<()> {
        if tag == Tag::Data {
            return Err(CursorError::ReservedTag(tag));
        }
        self.stack.push(Element::new(tag));
        Ok(())
    }

    fn pop_group(&mut self, tag: Tag) -> CursorResult<()> {
        match self.stack.len() {
            0 => return Err(CursorError::StackEmpty),
            1 => return Err(CursorError::AtRoot),
            _ => {}
        }
        let open = self.top()?.tag;
        if open != tag {
            return Err(CursorError::TagMismatch {
                expected: tag,
                found: open,
            });
        }
        let done = self.stack.pop().ok_or(CursorError::StackEmpty)?;
        self.top()?.children.push(done);
        Ok(())
    }

    fn write_data(&mut self, value: Value) -> CursorResult<()> {
        let text = value_to_text(&value, &self.options)?;
        self.top()?.children.push(Element::data(text));
        Ok(())
    }

    fn write_attribute(&mut self, key: Tag, value: Value) -> CursorResult<()> {
        let text = value_to_text(&value, &self.options)?;
        self.top()?.attributes.insert(key, Value::String(text));
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl SubtreeWriter for TextSaver {
    type Fragment = Vec<Element>;

    fn fork(&self) -> Self {
        Self::new(self.encoding, self.options.clone())
    }

    fn into_fragment(self) -> CursorResult<Self::Fragment> {
        let (root, _, _) = self.finish()?;
        Ok(root.children)
    }

    fn splice(&mut self, fragment: Self::Fragment) -> CursorResult<()> {
        self.top()?.children.extend(fragment);
        Ok(())
    }
}
