use std::path::Path;

use chipdoc_types::{FormatVersion, Tag, TextEncoding, Value};
use tracing::{debug, info};

use super::{json, xml};
use crate::cursor::TreeReader;
use crate::element::Element;
use crate::error::{CursorError, CursorResult};
use crate::sibling::SiblingCursor;

/// Cursor over a parsed XML or JSON document.
///
/// The document is parsed into an [`Element`] tree up front. Each open group
/// keeps its own [`SiblingCursor`], created fresh when the group is entered.
#[derive(Debug)]
pub struct TextLoader {
    root: Element,
    version: FormatVersion,
    encoding: TextEncoding,
    // child indices from the root to the open group
    path: Vec<usize>,
    cursors: Vec<SiblingCursor>,
}

impl TextLoader {
    pub fn open_str(text: &str, encoding: TextEncoding) -> CursorResult<Self> {
        let (root, version) = match encoding {
            TextEncoding::Xml => xml::from_str(text)?,
            TextEncoding::Json => json::from_str(text)?,
        };
        debug!(?encoding, %version, nodes = root.node_count(), "text document parsed");
        let cursor = SiblingCursor::new(root.children.len());
        Ok(Self {
            root,
            version,
            encoding,
            path: Vec::new(),
            cursors: vec![cursor],
        })
    }

    pub fn open_file(path: impl AsRef<Path>, encoding: TextEncoding) -> CursorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let loader = Self::open_str(&text, encoding)?;
        info!(path = %path.display(), version = %loader.version, "text document opened");
        Ok(loader)
    }

    /// Format version declared by the document.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// The whole parsed document.
    pub fn root(&self) -> &Element {
        &self.root
    }

    fn current(&self) -> &Element {
        self.path
            .iter()
            .fold(&self.root, |node, &index| &node.children[index])
    }

    fn cursor(&self) -> CursorResult<&SiblingCursor> {
        self.cursors.last().ok_or(CursorError::StackEmpty)
    }

    fn cursor_mut(&mut self) -> CursorResult<&mut SiblingCursor> {
        self.cursors.last_mut().ok_or(CursorError::StackEmpty)
    }

    fn descend(&mut self, index: usize) -> CursorResult<()> {
        let child_count = self.current().children[index].children.len();
        self.cursor_mut()?.mark_visited(index);
        self.path.push(index);
        self.cursors.push(SiblingCursor::new(child_count));
        Ok(())
    }
}

impl TreeReader for TextLoader {
    fn enter_group(&mut self, tag: Tag) -> CursorResult<()> {
        let node = self.current();
        let index = self
            .cursor()?
            .next_group(|i| node.children[i].is_group(tag))
            .ok_or(CursorError::GroupNotFound {
                parent: node.tag,
                tag,
            })?;
        self.descend(index)
    }

    fn enter_group_keyed(&mut self, tag: Tag, key: Tag, value: &str) -> CursorResult<()> {
        let node = self.current();
        let index = self
            .cursor()?
            .find_first(|i| {
                let child = &node.children[i];
                child.is_group(tag)
                    && child.lookup(key).and_then(Value::as_key).as_deref() == Some(value)
            })
            .ok_or_else(|| CursorError::KeyNotFound {
                parent: node.tag,
                tag,
                key,
                value: value.to_string(),
            })?;
        self.descend(index)
    }

    fn leave_group(&mut self, tag: Tag) -> CursorResult<()> {
        if self.path.is_empty() {
            return Err(CursorError::AtRoot);
        }
        let open = self.current().tag;
        if open != tag {
            return Err(CursorError::TagMismatch {
                expected: tag,
                found: open,
            });
        }
        let index = self.path.pop().ok_or(CursorError::AtRoot)?;
        self.cursors.pop();
        self.cursor_mut()?.left(index);
        Ok(())
    }

    fn verify_group(&self, tag: Tag) -> bool {
        self.current().tag == tag
    }

    fn current_tag(&self) -> Option<Tag> {
        Some(self.current().tag)
    }

    fn depth(&self) -> usize {
        self.path.len() + 1
    }

    fn read_data(&mut self) -> CursorResult<Value> {
        let node = self
            .path
            .iter()
            .fold(&self.root, |node, &index| &node.children[index]);
        let cursor = self.cursors.last_mut().ok_or(CursorError::StackEmpty)?;
        let index = cursor
            .next_data(|i| node.children[i].is_data())
            .ok_or(CursorError::MissingData(node.tag))?;
        node.children[index]
            .value
            .clone()
            .ok_or(CursorError::MissingData(node.tag))
    }

    fn read_attribute(&mut self, key: Tag) -> CursorResult<Value> {
        let node = self.current();
        node.lookup(key)
            .cloned()
            .ok_or(CursorError::MissingAttribute {
                parent: node.tag,
                key,
            })
    }

    fn children(&mut self) -> CursorResult<Vec<Tag>> {
        Ok(self.current().children.iter().map(|c| c.tag).collect())
    }

    fn attribute_keys(&mut self) -> CursorResult<Vec<Tag>> {
        Ok(self.current().attributes.keys().copied().collect())
    }
}
