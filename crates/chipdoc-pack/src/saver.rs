use std::path::Path;

use chipdoc_tree::{CursorError, CursorResult, SubtreeWriter, TreeWriter};
use chipdoc_types::{FormatVersion, Tag, Value};
use tracing::{debug, info};

use crate::config::SaveOptions;
use crate::container::seal;
use crate::error::PackResult;
use crate::node::{encode_value, patch_size, write_header, ATTRIBUTE, LEAF};

/// Writes a binary tag tree into an owned buffer and seals it on save.
///
/// A saver made by [`BinarySaver::new`] opens the `Document` root and writes
/// the format version as its first attribute. A fork made by
/// [`SubtreeWriter::fork`] starts with nothing open and produces raw node
/// bytes for splicing.
#[derive(Debug)]
pub struct BinarySaver {
    buf: Vec<u8>,
    // (tag, header offset) of every open group
    stack: Vec<(Tag, usize)>,
    // groups the caller may not pop: 1 for a document, 0 for a fork
    base: usize,
    options: SaveOptions,
}

impl BinarySaver {
    pub fn new(options: SaveOptions) -> Self {
        let mut buf = Vec::with_capacity(4096);
        let root = write_header(&mut buf, Tag::Document.code(), 0);
        // kind byte + u32
        write_header(&mut buf, Tag::Version.code() | LEAF | ATTRIBUTE, 5);
        encode_value(&mut buf, &Value::U32(FormatVersion::CURRENT.to_u32()));
        Self {
            buf,
            stack: vec![(Tag::Document, root)],
            base: 1,
            options,
        }
    }

    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    fn write_leaf(&mut self, tag_byte: u8, value: &Value) -> CursorResult<()> {
        if self.stack.is_empty() {
            return Err(CursorError::StackEmpty);
        }
        let at = write_header(&mut self.buf, tag_byte, 0);
        encode_value(&mut self.buf, value);
        patch_size(&mut self.buf, at)
    }

    fn finish_tree(mut self) -> CursorResult<(Vec<u8>, SaveOptions)> {
        if self.base != 1 {
            return Err(CursorError::StackEmpty);
        }
        if self.stack.len() != 1 {
            return Err(CursorError::Unbalanced(self.stack.len().saturating_sub(1)));
        }
        if let Some((_, root)) = self.stack.pop() {
            patch_size(&mut self.buf, root)?;
        }
        Ok((self.buf, self.options))
    }

    /// Close the document and seal it with the saver's options.
    pub fn save_to_memory(self) -> PackResult<Vec<u8>> {
        let (tree, options) = self.finish_tree()?;
        let bytes = seal(&tree, &options)?;
        debug!(tree_len = tree.len(), sealed_len = bytes.len(), "binary document saved to memory");
        Ok(bytes)
    }

    pub fn save_to_file(self, path: impl AsRef<Path>) -> PackResult<()> {
        let path = path.as_ref();
        let bytes = self.save_to_memory()?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "binary document saved");
        Ok(())
    }
}

impl TreeWriter for BinarySaver {
    fn push_group(&mut self, tag: Tag) -> CursorResult<()> {
        if tag == Tag::Data {
            return Err(CursorError::ReservedTag(tag));
        }
        let at = write_header(&mut self.buf, tag.code(), 0);
        self.stack.push((tag, at));
        Ok(())
    }

    fn pop_group(&mut self, tag: Tag) -> CursorResult<()> {
        if self.stack.len() <= self.base {
            return Err(if self.stack.is_empty() {
                CursorError::StackEmpty
            } else {
                CursorError::AtRoot
            });
        }
        let (open, at) = *self.stack.last().ok_or(CursorError::StackEmpty)?;
        if open != tag {
            return Err(CursorError::TagMismatch {
                expected: tag,
                found: open,
            });
        }
        patch_size(&mut self.buf, at)?;
        self.stack.pop();
        Ok(())
    }

    fn write_data(&mut self, value: Value) -> CursorResult<()> {
        self.write_leaf(Tag::Data.code() | LEAF, &value)
    }

    fn write_attribute(&mut self, key: Tag, value: Value) -> CursorResult<()> {
        self.write_leaf(key.code() | LEAF | ATTRIBUTE, &value)
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl SubtreeWriter for BinarySaver {
    /// Complete top-level nodes, ready to append to a parent group body.
    type Fragment = Vec<u8>;

    fn fork(&self) -> Self {
        Self {
            buf: Vec::new(),
            stack: Vec::new(),
            base: 0,
            options: self.options.clone(),
        }
    }

    fn into_fragment(self) -> CursorResult<Self::Fragment> {
        if !self.stack.is_empty() {
            return Err(CursorError::Unbalanced(self.stack.len()));
        }
        Ok(self.buf)
    }

    fn splice(&mut self, fragment: Self::Fragment) -> CursorResult<()> {
        if self.stack.is_empty() {
            return Err(CursorError::StackEmpty);
        }
        self.buf.extend_from_slice(&fragment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackError;
    use crate::node::{read_header, NODE_HEADER_LEN};
    use chipdoc_types::{EncryptionLevel, Signature};

    fn finish(saver: BinarySaver) -> Vec<u8> {
        saver.finish_tree().unwrap().0
    }

    #[test]
    fn root_starts_with_version_attribute() {
        let tree = finish(BinarySaver::new(SaveOptions::default()));
        let root = read_header(&tree, 0, tree.len()).unwrap();
        assert_eq!(root.code, Tag::Document.code());
        assert_eq!(root.end(), tree.len());
        let version = read_header(&tree, root.body, root.end()).unwrap();
        assert_eq!(version.code, Tag::Version.code());
        assert!(version.leaf && version.attribute);
        assert_eq!(version.size, 5);
    }

    #[test]
    fn group_sizes_are_patched() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        saver.push_group(Tag::Chips).unwrap();
        saver.write(7u8).unwrap();
        saver.pop_group(Tag::Chips).unwrap();
        let tree = finish(saver);
        // root header + version leaf (5 + 5) + chips header + data leaf (5 + 2)
        let chips_at = NODE_HEADER_LEN + 10;
        let chips = read_header(&tree, chips_at, tree.len()).unwrap();
        assert_eq!(chips.code, Tag::Chips.code());
        assert_eq!(chips.size, NODE_HEADER_LEN + 2);
    }

    #[test]
    fn nesting_errors() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        assert!(matches!(saver.pop_group(Tag::Document), Err(CursorError::AtRoot)));
        saver.push_group(Tag::Chips).unwrap();
        assert!(matches!(
            saver.pop_group(Tag::Connections),
            Err(CursorError::TagMismatch { .. })
        ));
        assert!(matches!(saver.push_group(Tag::Data), Err(CursorError::ReservedTag(_))));
        assert_eq!(saver.depth(), 2);
        let err = saver.save_to_memory().unwrap_err();
        assert!(matches!(err, PackError::Cursor(CursorError::Unbalanced(1))));
    }

    #[test]
    fn signature_rejected_below_level2() {
        let saver = BinarySaver::new(
            SaveOptions::default()
                .with_encryption(EncryptionLevel::Level1)
                .with_signature(Signature::derive("acme")),
        );
        assert!(matches!(
            saver.save_to_memory(),
            Err(PackError::SignatureNotAllowed(EncryptionLevel::Level1))
        ));
    }

    #[test]
    fn fork_produces_closed_nodes() {
        let saver = BinarySaver::new(SaveOptions::default());
        let mut fork = saver.fork();
        assert!(matches!(fork.write(1u8), Err(CursorError::StackEmpty)));
        assert!(matches!(fork.pop_group(Tag::Chip), Err(CursorError::StackEmpty)));
        fork.push_group(Tag::Chip).unwrap();
        fork.write_attr(Tag::Type, "Adder").unwrap();
        fork.pop_group(Tag::Chip).unwrap();
        let fragment = fork.into_fragment().unwrap();
        let chip = read_header(&fragment, 0, fragment.len()).unwrap();
        assert_eq!(chip.code, Tag::Chip.code());
        assert_eq!(chip.end(), fragment.len());
    }

    #[test]
    fn open_fork_is_unbalanced() {
        let mut fork = BinarySaver::new(SaveOptions::default()).fork();
        fork.push_group(Tag::Chip).unwrap();
        assert!(matches!(fork.into_fragment(), Err(CursorError::Unbalanced(1))));
    }
}
