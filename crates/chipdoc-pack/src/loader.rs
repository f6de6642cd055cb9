use std::collections::BTreeSet;
use std::path::Path;

use chipdoc_tree::{CursorError, CursorResult, SiblingCursor, TreeReader};
use chipdoc_types::{EncryptionLevel, FormatVersion, Tag, TagTable, Value};
use tracing::{debug, info};

use crate::config::OpenOptions;
use crate::container::{unseal, Unsealed};
use crate::error::PackResult;
use crate::header::{EncryptedHeader, Header};
use crate::node::{decode_value, read_header, NodeHeader};

const ROOT: usize = 0;

/// A run of consecutive arena slots.
#[derive(Clone, Copy, Debug, Default)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn get(&self, i: usize) -> usize {
        self.start + i
    }

    fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Clone, Copy, Debug)]
enum Kind {
    Data,
    Attribute,
    Unexplored,
    /// `items` holds child groups and `Data` leaves in document order,
    /// `attributes` the attribute leaves.
    Explored { items: Span, attributes: Span },
}

#[derive(Clone, Copy, Debug)]
struct Node {
    tag: Tag,
    header: NodeHeader,
    kind: Kind,
}

impl Node {
    fn is_group(&self, tag: Tag) -> bool {
        self.tag == tag && !matches!(self.kind, Kind::Data | Kind::Attribute)
    }
}

#[derive(Debug)]
struct Frame {
    node: usize,
    cursor: SiblingCursor,
}

fn corrupt(offset: usize, reason: impl Into<String>) -> CursorError {
    CursorError::Corrupt {
        offset,
        reason: reason.into(),
    }
}

/// Cursor over an unsealed binary document.
///
/// Only node headers are parsed, and only for groups that are actually
/// entered or searched: a group's children are scanned the first time it is
/// visited and cached in an arena. Leaf values are decoded when read.
#[derive(Debug)]
pub struct BinaryLoader {
    tree: Vec<u8>,
    table: TagTable,
    nodes: Vec<Node>,
    stack: Vec<Frame>,
    header: Option<Header>,
    level: EncryptionLevel,
    encrypted_header: EncryptedHeader,
}

impl BinaryLoader {
    /// Unseal `bytes` and open the tree inside.
    pub fn open_memory(bytes: &[u8], options: &OpenOptions) -> PackResult<Self> {
        let Unsealed {
            header,
            level,
            encrypted_header,
            tree,
        } = unseal(bytes, &options.gate)?;
        let mut loader = Self::from_tree(tree)?;
        loader.header = Some(header);
        loader.level = level;
        loader.encrypted_header = encrypted_header;
        Ok(loader)
    }

    pub fn open_file(path: impl AsRef<Path>, options: &OpenOptions) -> PackResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let loader = Self::open_memory(&bytes, options)?;
        info!(
            path = %path.display(),
            version = %loader.version(),
            level = %loader.level,
            "binary document opened"
        );
        Ok(loader)
    }

    /// Open an already unsealed tag tree.
    pub fn from_tree(tree: Vec<u8>) -> CursorResult<Self> {
        let root = read_header(&tree, 0, tree.len())?;
        if root.code != Tag::Document.code() || root.leaf {
            return Err(corrupt(0, "root node is not a Document group"));
        }
        if root.end() != tree.len() {
            return Err(corrupt(
                root.end(),
                format!("{} trailing bytes after the root", tree.len() - root.end()),
            ));
        }

        let version_at = root.body;
        let version_node = read_header(&tree, version_at, root.end())
            .map_err(|_| corrupt(version_at, "missing format version"))?;
        if version_node.code != Tag::Version.code() || !version_node.attribute {
            return Err(corrupt(version_at, "first root child is not the format version"));
        }
        let stored = &tree[version_node.body..version_node.end()];
        let version = match decode_value(stored, version_node.body)? {
            Value::U32(v) => FormatVersion::from_u32(v),
            other => {
                return Err(corrupt(
                    version_at,
                    format!("format version stored as {}", other.kind()),
                ))
            }
        };
        let table = TagTable::for_version(version)?;

        // the root's body, minus the version leaf
        let body = NodeHeader {
            body: version_node.end(),
            size: root.end() - version_node.end(),
            ..root
        };
        let mut loader = Self {
            tree,
            table,
            nodes: vec![Node {
                tag: Tag::Document,
                header: body,
                kind: Kind::Unexplored,
            }],
            stack: Vec::new(),
            header: None,
            level: EncryptionLevel::None,
            encrypted_header: EncryptedHeader::default(),
        };
        let (items, _) = loader.explore(ROOT)?;
        loader.stack.push(Frame {
            node: ROOT,
            cursor: SiblingCursor::new(items.len),
        });
        debug!(%version, tree_len = loader.tree.len(), "binary tree opened");
        Ok(loader)
    }

    pub fn version(&self) -> FormatVersion {
        self.table.version()
    }

    pub fn level(&self) -> EncryptionLevel {
        self.level
    }

    /// The clear header, when the loader was opened from sealed bytes.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn encrypted_header(&self) -> &EncryptedHeader {
        &self.encrypted_header
    }

    /// Scan the children of group `index` once, appending them to the arena.
    fn explore(&mut self, index: usize) -> CursorResult<(Span, Span)> {
        let node = self.nodes[index];
        match node.kind {
            Kind::Explored { items, attributes } => return Ok((items, attributes)),
            Kind::Data | Kind::Attribute => return Ok((Span::default(), Span::default())),
            Kind::Unexplored => {}
        }

        let end = node.header.end();
        let mut offset = node.header.body;
        let mut items = Vec::new();
        let mut attributes = Vec::new();
        while offset < end {
            let child = read_header(&self.tree, offset, end)?;
            let tag = self
                .table
                .from_code(child.code)
                .ok_or_else(|| corrupt(offset, format!("unknown tag code {}", child.code)))?;
            let kind = match (child.leaf, child.attribute) {
                (true, true) => Kind::Attribute,
                (true, false) if tag == Tag::Data => Kind::Data,
                (true, false) => {
                    return Err(corrupt(offset, format!("{tag} leaf without attribute flag")))
                }
                (false, _) if tag == Tag::Data => {
                    return Err(corrupt(offset, "Data node is not a leaf"))
                }
                (false, _) => Kind::Unexplored,
            };
            let entry = Node {
                tag,
                header: child,
                kind,
            };
            match kind {
                Kind::Attribute => attributes.push(entry),
                _ => items.push(entry),
            }
            offset = child.end();
        }

        let items_span = Span {
            start: self.nodes.len(),
            len: items.len(),
        };
        self.nodes.extend(items);
        let attributes_span = Span {
            start: self.nodes.len(),
            len: attributes.len(),
        };
        self.nodes.extend(attributes);
        self.nodes[index].kind = Kind::Explored {
            items: items_span,
            attributes: attributes_span,
        };
        Ok((items_span, attributes_span))
    }

    fn value(&self, index: usize) -> CursorResult<Value> {
        let header = self.nodes[index].header;
        decode_value(&self.tree[header.body..header.end()], header.body)
    }

    /// Attribute `key` of group `index`, or the first `Data` of its first
    /// child group tagged `key`. The last write of a repeated attribute wins.
    fn lookup(&mut self, index: usize, key: Tag) -> CursorResult<Option<Value>> {
        let (items, attributes) = self.explore(index)?;
        if let Some(attr) = attributes.indices().rev().find(|&i| self.nodes[i].tag == key) {
            return self.value(attr).map(Some);
        }
        let Some(field) = items.indices().find(|&i| self.nodes[i].is_group(key)) else {
            return Ok(None);
        };
        let (field_items, _) = self.explore(field)?;
        match field_items
            .indices()
            .find(|&i| matches!(self.nodes[i].kind, Kind::Data))
        {
            Some(data) => self.value(data).map(Some),
            None => Ok(None),
        }
    }

    fn top(&self) -> CursorResult<&Frame> {
        self.stack.last().ok_or(CursorError::StackEmpty)
    }

    fn items(&mut self) -> CursorResult<Span> {
        let node = self.top()?.node;
        Ok(self.explore(node)?.0)
    }

    fn descend(&mut self, items: Span, i: usize) -> CursorResult<()> {
        let child = items.get(i);
        let (child_items, _) = self.explore(child)?;
        let frame = self.stack.last_mut().ok_or(CursorError::StackEmpty)?;
        frame.cursor.mark_visited(i);
        self.stack.push(Frame {
            node: child,
            cursor: SiblingCursor::new(child_items.len),
        });
        Ok(())
    }
}

impl TreeReader for BinaryLoader {
    fn enter_group(&mut self, tag: Tag) -> CursorResult<()> {
        let items = self.items()?;
        let frame = self.top()?;
        let found = frame
            .cursor
            .next_group(|i| self.nodes[items.get(i)].is_group(tag));
        let i = found.ok_or(CursorError::GroupNotFound {
            parent: self.nodes[frame.node].tag,
            tag,
        })?;
        self.descend(items, i)
    }

    fn enter_group_keyed(&mut self, tag: Tag, key: Tag, value: &str) -> CursorResult<()> {
        let items = self.items()?;
        for i in 0..items.len {
            let child = items.get(i);
            if !self.nodes[child].is_group(tag) {
                continue;
            }
            let matched = self
                .lookup(child, key)?
                .as_ref()
                .and_then(Value::as_key)
                .is_some_and(|k| k == value);
            if matched {
                return self.descend(items, i);
            }
        }
        Err(CursorError::KeyNotFound {
            parent: self.nodes[self.top()?.node].tag,
            tag,
            key,
            value: value.to_string(),
        })
    }

    fn leave_group(&mut self, tag: Tag) -> CursorResult<()> {
        if self.stack.len() <= 1 {
            return Err(CursorError::AtRoot);
        }
        let open = self.nodes[self.top()?.node].tag;
        if open != tag {
            return Err(CursorError::TagMismatch {
                expected: tag,
                found: open,
            });
        }
        let child = self.stack.pop().ok_or(CursorError::StackEmpty)?.node;
        let parent = self.stack.last_mut().ok_or(CursorError::StackEmpty)?;
        if let Kind::Explored { items, .. } = self.nodes[parent.node].kind {
            parent.cursor.left(child - items.start);
        }
        Ok(())
    }

    fn verify_group(&self, tag: Tag) -> bool {
        self.current_tag() == Some(tag)
    }

    fn current_tag(&self) -> Option<Tag> {
        self.stack.last().map(|f| self.nodes[f.node].tag)
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn read_data(&mut self) -> CursorResult<Value> {
        let items = self.items()?;
        let nodes = &self.nodes;
        let frame = self.stack.last_mut().ok_or(CursorError::StackEmpty)?;
        let parent = nodes[frame.node].tag;
        let i = frame
            .cursor
            .next_data(|i| matches!(nodes[items.get(i)].kind, Kind::Data))
            .ok_or(CursorError::MissingData(parent))?;
        self.value(items.get(i))
    }

    fn read_attribute(&mut self, key: Tag) -> CursorResult<Value> {
        let node = self.top()?.node;
        self.lookup(node, key)?
            .ok_or(CursorError::MissingAttribute {
                parent: self.nodes[node].tag,
                key,
            })
    }

    fn children(&mut self) -> CursorResult<Vec<Tag>> {
        let items = self.items()?;
        Ok(items.indices().map(|i| self.nodes[i].tag).collect())
    }

    fn attribute_keys(&mut self) -> CursorResult<Vec<Tag>> {
        let node = self.top()?.node;
        let (_, attributes) = self.explore(node)?;
        let keys: BTreeSet<Tag> = attributes.indices().map(|i| self.nodes[i].tag).collect();
        Ok(keys.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackError;
    use crate::node::{encode_value, patch_size, write_header, ATTRIBUTE, LEAF};
    use crate::saver::BinarySaver;
    use crate::SaveOptions;
    use chipdoc_crypto::{CompressionLevel, CryptoError, Level2Gate, UNLOCK_TOKEN};
    use chipdoc_tree::{read_element, SubtreeWriter, TreeWriter};
    use chipdoc_types::{LicenseId, Signature};
    use std::sync::Arc;

    const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];

    fn build(saver: &mut BinarySaver) {
        saver.write_attr(Tag::Comment, "three chips").unwrap();
        saver.push_group(Tag::Chips).unwrap();
        for (i, name) in NAMES.into_iter().enumerate() {
            saver.push_group(Tag::Chip).unwrap();
            saver.write_attr(Tag::Id, i as u32).unwrap();
            saver.write_field(Tag::Name, name).unwrap();
            saver.write(i as f64 * 1.5).unwrap();
            saver.write(vec![1u8, 2, 3, i as u8]).unwrap();
            saver.write((0..400i64).collect::<Vec<_>>()).unwrap();
            saver.pop_group(Tag::Chip).unwrap();
        }
        saver.pop_group(Tag::Chips).unwrap();
        saver.push_group(Tag::Connections).unwrap();
        saver.pop_group(Tag::Connections).unwrap();
    }

    fn saved(options: SaveOptions) -> Vec<u8> {
        let mut saver = BinarySaver::new(options);
        build(&mut saver);
        saver.save_to_memory().unwrap()
    }

    fn unlocked() -> OpenOptions {
        let gate = Level2Gate::new();
        gate.register_unlock(|| UNLOCK_TOKEN);
        OpenOptions::with_gate(Arc::new(gate))
    }

    #[test]
    fn typed_roundtrip_every_combination() {
        for compression in [CompressionLevel::None, CompressionLevel::Default] {
            for encryption in [EncryptionLevel::None, EncryptionLevel::Level1, EncryptionLevel::Level2] {
                let license = LicenseId::generate();
                let options = SaveOptions::default()
                    .with_compression(compression)
                    .with_encryption(encryption)
                    .with_license(license);
                let bytes = saved(options);
                let mut loader = BinaryLoader::open_memory(&bytes, &unlocked()).unwrap();
                assert_eq!(loader.version(), FormatVersion::CURRENT);
                assert_eq!(loader.level(), encryption);
                assert_eq!(loader.encrypted_header().license_id, license);
                assert_eq!(
                    loader.header().unwrap().is_compressed(),
                    compression != CompressionLevel::None
                );

                assert_eq!(loader.attribute_keys().unwrap(), vec![Tag::Comment]);
                assert_eq!(loader.read_attr::<String>(Tag::Comment).unwrap(), "three chips");
                loader.enter_group(Tag::Chips).unwrap();
                assert_eq!(loader.count_groups(Tag::Chip).unwrap(), 3);
                for i in 0..3u32 {
                    loader.enter_group(Tag::Chip).unwrap();
                    assert_eq!(loader.read_attr::<u32>(Tag::Id).unwrap(), i);
                    assert_eq!(loader.read::<f64>().unwrap(), i as f64 * 1.5);
                    assert_eq!(loader.read::<Vec<u8>>().unwrap(), vec![1, 2, 3, i as u8]);
                    assert_eq!(loader.read::<Vec<i64>>().unwrap(), (0..400).collect::<Vec<_>>());
                    assert!(matches!(loader.read_data(), Err(CursorError::MissingData(Tag::Chip))));
                    assert_eq!(loader.read_attr::<String>(Tag::Name).unwrap(), NAMES[i as usize]);
                    loader.leave_group(Tag::Chip).unwrap();
                }
                assert!(matches!(
                    loader.enter_group(Tag::Chip),
                    Err(CursorError::GroupNotFound { .. })
                ));
                loader.leave_group(Tag::Chips).unwrap();
                loader.enter_group(Tag::Connections).unwrap();
                assert!(loader.children().unwrap().is_empty());
                loader.leave_group(Tag::Connections).unwrap();
                assert_eq!(loader.depth(), 1);
            }
        }
    }

    #[test]
    fn same_tag_siblings_enumerate_once_with_wrap() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        for (i, tag) in [Tag::Chip, Tag::Types, Tag::Chip, Tag::Connections, Tag::Chip]
            .into_iter()
            .enumerate()
        {
            saver.push_group(tag).unwrap();
            saver.write_attr(Tag::Id, i as u32).unwrap();
            saver.pop_group(tag).unwrap();
        }
        let bytes = saver.save_to_memory().unwrap();
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();

        let next = |loader: &mut BinaryLoader, tag| -> Option<u32> {
            loader.enter_group(tag).ok()?;
            let id = loader.read_attr(Tag::Id).ok()?;
            loader.leave_group(tag).ok()?;
            Some(id)
        };
        assert_eq!(next(&mut loader, Tag::Connections), Some(3));
        assert_eq!(next(&mut loader, Tag::Chip), Some(4));
        assert_eq!(next(&mut loader, Tag::Chip), Some(0));
        assert_eq!(next(&mut loader, Tag::Chip), Some(2));
        assert_eq!(next(&mut loader, Tag::Chip), None);
        assert_eq!(next(&mut loader, Tag::Types), Some(1));
    }

    #[test]
    fn keyed_lookup_by_attribute_and_field() {
        let bytes = saved(SaveOptions::default());
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        loader.enter_group(Tag::Chips).unwrap();

        loader.enter_group_keyed(Tag::Chip, Tag::Id, "2").unwrap();
        assert_eq!(loader.read_field::<String>(Tag::Name).unwrap(), "gamma");
        loader.leave_group(Tag::Chip).unwrap();

        loader.enter_group_keyed(Tag::Chip, Tag::Name, "beta").unwrap();
        assert_eq!(loader.read_attr::<u32>(Tag::Id).unwrap(), 1);
        loader.leave_group(Tag::Chip).unwrap();

        assert!(matches!(
            loader.enter_group_keyed(Tag::Chip, Tag::Id, "9"),
            Err(CursorError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn matches_text_element_tree() {
        let bytes = saved(SaveOptions::default());
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        let tree = read_element(&mut loader).unwrap();
        assert_eq!(tree.tag, Tag::Document);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].children.len(), 3);
        assert!(tree.attribute(Tag::Version).is_none());
    }

    #[test]
    fn deeply_nested_tree_is_refused_by_read_element() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        for _ in 0..10_000 {
            saver.push_group(Tag::Chips).unwrap();
        }
        for _ in 0..10_000 {
            saver.pop_group(Tag::Chips).unwrap();
        }
        let bytes = saver.save_to_memory().unwrap();
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        let err = read_element(&mut loader).unwrap_err();
        assert!(matches!(err, CursorError::Malformed(_)), "{err}");
    }

    #[test]
    fn leave_checks_tag_and_root() {
        let bytes = saved(SaveOptions::plain());
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        assert!(matches!(loader.leave_group(Tag::Document), Err(CursorError::AtRoot)));
        loader.enter_group(Tag::Chips).unwrap();
        assert!(loader.verify_group(Tag::Chips));
        assert!(matches!(
            loader.leave_group(Tag::Chip),
            Err(CursorError::TagMismatch { .. })
        ));
    }

    #[test]
    fn forks_splice_in_order() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        saver.push_group(Tag::Chips).unwrap();
        let fragments: Vec<_> = (0..3u32)
            .map(|i| {
                let mut fork = saver.fork();
                fork.push_group(Tag::Chip).unwrap();
                fork.write_attr(Tag::Id, i).unwrap();
                fork.pop_group(Tag::Chip).unwrap();
                fork.into_fragment().unwrap()
            })
            .collect();
        for fragment in fragments.into_iter().rev() {
            saver.splice(fragment).unwrap();
        }
        saver.pop_group(Tag::Chips).unwrap();
        let bytes = saver.save_to_memory().unwrap();

        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        loader.enter_group(Tag::Chips).unwrap();
        let ids: Vec<u32> = (0..3)
            .map(|_| {
                loader.enter_group(Tag::Chip).unwrap();
                let id: u32 = loader.read_attr(Tag::Id).unwrap();
                loader.leave_group(Tag::Chip).unwrap();
                id
            })
            .collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn tampered_document_rejected() {
        let mut bytes = saved(SaveOptions::plain());
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch { .. }));
        assert!(err.is_integrity());
    }

    #[test]
    fn foreign_bytes_rejected() {
        let err = BinaryLoader::open_memory(b"<Document/>", &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::Truncated(_)));
        let mut bytes = saved(SaveOptions::plain());
        bytes[3] = b'X';
        let err = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn level2_requires_unlock_and_pins_signature() {
        let vendor = Signature::derive("acme");
        let options = SaveOptions::default()
            .with_encryption(EncryptionLevel::Level2)
            .with_signature(vendor);
        let bytes = saved(options.clone());

        let locked = OpenOptions::with_gate(Arc::new(Level2Gate::new()));
        let err = BinaryLoader::open_memory(&bytes, &locked).unwrap_err();
        assert!(matches!(err, PackError::Crypto(CryptoError::UnlockMissing)));
        assert!(err.is_policy());

        let open = unlocked();
        let loader = BinaryLoader::open_memory(&bytes, &open).unwrap();
        assert_eq!(loader.encrypted_header().signature, vendor);
        assert_eq!(open.gate.pinned(), Some(vendor));

        let other = saved(options.with_signature(Signature::derive("rival")));
        let err = BinaryLoader::open_memory(&other, &open).unwrap_err();
        assert!(matches!(err, PackError::Crypto(CryptoError::SignatureConflict { .. })));
    }

    fn leaf(buf: &mut Vec<u8>, tag_byte: u8, value: Value) {
        let at = write_header(buf, tag_byte, 0);
        encode_value(buf, &value);
        patch_size(buf, at).unwrap();
    }

    /// A version 1 tree written by hand: `Content` and `Comment` swap codes.
    fn legacy_tree() -> Vec<u8> {
        let mut buf = Vec::new();
        let root = write_header(&mut buf, Tag::Document.code(), 0);
        leaf(
            &mut buf,
            Tag::Version.code() | LEAF | ATTRIBUTE,
            Value::U32(FormatVersion::LEGACY_V1.to_u32()),
        );
        leaf(&mut buf, Tag::Content.code() | LEAF | ATTRIBUTE, Value::from("old note"));
        let chip = write_header(&mut buf, Tag::Chip.code(), 0);
        leaf(&mut buf, Tag::Data.code() | LEAF, Value::U8(9));
        patch_size(&mut buf, chip).unwrap();
        patch_size(&mut buf, root).unwrap();
        buf
    }

    #[test]
    fn legacy_codes_are_mapped() {
        let mut loader = BinaryLoader::from_tree(legacy_tree()).unwrap();
        assert_eq!(loader.version(), FormatVersion::LEGACY_V1);
        assert_eq!(loader.attribute_keys().unwrap(), vec![Tag::Comment]);
        assert_eq!(loader.read_attr::<String>(Tag::Comment).unwrap(), "old note");
        assert_eq!(loader.read_field::<u8>(Tag::Chip).unwrap(), 9);
        assert!(loader.header().is_none());
    }

    #[test]
    fn legacy_tree_rejects_unknown_codes() {
        let mut buf = Vec::new();
        let root = write_header(&mut buf, Tag::Document.code(), 0);
        leaf(
            &mut buf,
            Tag::Version.code() | LEAF | ATTRIBUTE,
            Value::U32(FormatVersion::LEGACY_V1.to_u32()),
        );
        let types = write_header(&mut buf, Tag::Types.code(), 0);
        patch_size(&mut buf, types).unwrap();
        patch_size(&mut buf, root).unwrap();
        let err = BinaryLoader::from_tree(buf).unwrap_err();
        assert!(matches!(err, CursorError::Corrupt { .. }));
    }

    #[test]
    fn malformed_trees_rejected() {
        let mut tree = legacy_tree();
        tree.push(0);
        assert!(BinaryLoader::from_tree(tree).is_err());

        let mut buf = Vec::new();
        let root = write_header(&mut buf, Tag::Document.code(), 0);
        leaf(&mut buf, Tag::Data.code() | LEAF, Value::U8(1));
        patch_size(&mut buf, root).unwrap();
        assert!(BinaryLoader::from_tree(buf).is_err());

        assert!(BinaryLoader::from_tree(Vec::new()).is_err());
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.chip");
        let mut saver = BinarySaver::new(SaveOptions::default().with_encryption(EncryptionLevel::Level1));
        build(&mut saver);
        saver.save_to_file(&path).unwrap();
        let mut loader = BinaryLoader::open_file(&path, &OpenOptions::default()).unwrap();
        assert_eq!(loader.read_attr::<String>(Tag::Comment).unwrap(), "three chips");
        assert!(matches!(
            BinaryLoader::open_file(dir.path().join("missing"), &OpenOptions::default()),
            Err(PackError::Io(_))
        ));
    }
}
