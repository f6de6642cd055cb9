use std::collections::BTreeMap;

use chipdoc_tree::{CursorResult, TreeReader, TreeWriter};
use chipdoc_types::Tag;
use parking_lot::RwLock;

/// Chip type names seen while saving or loading, with occurrence counts.
///
/// Shared by every worker during a parallel save. Workers only insert, so
/// each write lock is held for one map update.
#[derive(Debug, Default)]
pub struct ChipTypeRegistry {
    types: RwLock<BTreeMap<String, u32>>,
}

impl ChipTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_name: &str) {
        let mut types = self.types.write();
        *types.entry(type_name.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, type_name: &str) -> u32 {
        self.types.read().get(type_name).copied().unwrap_or(0)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    /// Number of distinct types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    pub fn clear(&self) {
        self.types.write().clear();
    }

    /// Sorted copy of the name → count map.
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.types.read().clone()
    }

    /// Write a `Types` group with one `Type` child per name.
    pub fn save<W: TreeWriter>(&self, writer: &mut W) -> CursorResult<()> {
        writer.push_group(Tag::Types)?;
        for (name, count) in self.snapshot() {
            writer.push_group(Tag::Type)?;
            writer.write_attr(Tag::Name, name)?;
            writer.write_attr(Tag::Count, count)?;
            writer.pop_group(Tag::Type)?;
        }
        writer.pop_group(Tag::Types)
    }

    /// Read the `Types` group written by [`ChipTypeRegistry::save`].
    pub fn load<R: TreeReader>(reader: &mut R) -> CursorResult<Self> {
        let mut types = BTreeMap::new();
        reader.enter_group(Tag::Types)?;
        for _ in 0..reader.count_groups(Tag::Type)? {
            reader.enter_group(Tag::Type)?;
            let name: String = reader.read_attr(Tag::Name)?;
            let count: u32 = reader.read_attr(Tag::Count)?;
            reader.leave_group(Tag::Type)?;
            types.insert(name, count);
        }
        reader.leave_group(Tag::Types)?;
        Ok(Self {
            types: RwLock::new(types),
        })
    }
}

impl Clone for ChipTypeRegistry {
    fn clone(&self) -> Self {
        Self {
            types: RwLock::new(self.snapshot()),
        }
    }
}

impl PartialEq for ChipTypeRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipdoc_tree::{TextLoader, TextOptions, TextSaver};
    use chipdoc_types::TextEncoding;
    use rayon::prelude::*;

    #[test]
    fn counts_concurrent_registrations() {
        let registry = ChipTypeRegistry::new();
        (0..1000).into_par_iter().for_each(|i| {
            registry.register(if i % 4 == 0 { "Not" } else { "And" });
        });
        assert_eq!(registry.count("And"), 750);
        assert_eq!(registry.count("Not"), 250);
        assert_eq!(registry.count("Or"), 0);
        assert_eq!(registry.len(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn save_and_load() {
        let registry = ChipTypeRegistry::new();
        registry.register("Clock");
        registry.register("And");
        registry.register("And");

        let mut saver = TextSaver::new(TextEncoding::Json, TextOptions::default());
        registry.save(&mut saver).unwrap();
        let text = saver.save_to_string().unwrap();

        let mut loader = TextLoader::open_str(&text, TextEncoding::Json).unwrap();
        let loaded = ChipTypeRegistry::load(&mut loader).unwrap();
        assert_eq!(loaded, registry);
        assert!(loaded.contains("Clock"));
        assert_eq!(loaded.count("And"), 2);
    }
}
