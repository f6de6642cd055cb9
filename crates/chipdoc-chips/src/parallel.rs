//! Chip fan-out.
//!
//! Every chip is written by its own fork of the parent writer, so workers
//! share nothing but the type registry. Fragments are spliced back into the
//! `Chips` group in chip order once all workers are done.

use chipdoc_tree::{CursorError, CursorResult, SubtreeWriter, TreeReader, TreeWriter};
use chipdoc_types::Tag;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chip::ChipSerialize;
use crate::error::{ChipError, ChipResult};
use crate::registry::ChipTypeRegistry;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipSaveOptions {
    /// Worker threads. `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl ChipSaveOptions {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
        }
    }
}

fn save_one<W: TreeWriter, C: ChipSerialize>(
    writer: &mut W,
    index: usize,
    chip: &C,
    registry: &ChipTypeRegistry,
) -> CursorResult<()> {
    let id = u32::try_from(index).map_err(|_| CursorError::Encode(format!("chip index {index}")))?;
    writer.push_group(Tag::Chip)?;
    writer.write_attr(Tag::Type, chip.type_name())?;
    writer.write_attr(Tag::Id, id)?;
    chip.save(writer)?;
    writer.pop_group(Tag::Chip)?;
    registry.register(chip.type_name());
    Ok(())
}

/// Write `chips` as a `Chips` group, serializing each chip on a worker.
///
/// On failure the error of the lowest failing chip is returned and nothing
/// is spliced; the parent's `Chips` group is left open and the caller
/// discards the writer.
pub fn save_chips<W, C>(
    writer: &mut W,
    chips: &[C],
    registry: &ChipTypeRegistry,
    options: &ChipSaveOptions,
) -> ChipResult<()>
where
    W: SubtreeWriter + Send,
    C: ChipSerialize,
{
    writer.push_group(Tag::Chips)?;
    let forks: Vec<W> = chips.iter().map(|_| writer.fork()).collect();

    let run = move || -> Vec<ChipResult<W::Fragment>> {
        forks
            .into_par_iter()
            .zip(chips.par_iter())
            .enumerate()
            .map(|(index, (mut fork, chip))| {
                save_one(&mut fork, index, chip, registry)
                    .and_then(|()| fork.into_fragment())
                    .map_err(|source| ChipError::Chip {
                        index,
                        type_name: chip.type_name().to_string(),
                        source,
                    })
            })
            .collect()
    };
    let fragments = match options.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run(),
    };
    debug!(chips = chips.len(), threads = ?options.threads, "chip fan-out finished");

    let fragments = fragments.into_iter().collect::<ChipResult<Vec<_>>>()?;
    for fragment in fragments {
        writer.splice(fragment)?;
    }
    writer.pop_group(Tag::Chips)?;
    Ok(())
}

/// Read every `Chip` of the next `Chips` group, in document order.
pub fn load_chips<R, C>(reader: &mut R, registry: &ChipTypeRegistry) -> ChipResult<Vec<C>>
where
    R: TreeReader,
    C: ChipSerialize,
{
    reader.enter_group(Tag::Chips)?;
    let count = reader.count_groups(Tag::Chip)?;
    let mut chips = Vec::with_capacity(count);
    for index in 0..count {
        reader.enter_group(Tag::Chip)?;
        let type_name: String = reader.read_attr(Tag::Type)?;
        let chip = C::load(&type_name, reader).map_err(|source| ChipError::Chip {
            index,
            type_name: type_name.clone(),
            source,
        })?;
        reader.leave_group(Tag::Chip)?;
        registry.register(&type_name);
        chips.push(chip);
    }
    reader.leave_group(Tag::Chips)?;
    debug!(chips = chips.len(), "chips loaded");
    Ok(chips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipdoc_pack::{BinaryLoader, BinarySaver, OpenOptions, SaveOptions};
    use chipdoc_tree::{TextLoader, TextOptions, TextSaver};
    use chipdoc_types::TextEncoding;
    use std::time::Duration;

    /// Sleeps before writing, so earlier chips finish last.
    #[derive(Debug, PartialEq)]
    struct Slow {
        delay_ms: u64,
        label: String,
    }

    impl ChipSerialize for Slow {
        fn type_name(&self) -> &str {
            "Slow"
        }

        fn save<W: TreeWriter>(&self, writer: &mut W) -> CursorResult<()> {
            std::thread::sleep(Duration::from_millis(self.delay_ms));
            if self.label == "broken" {
                return Err(CursorError::Encode("cannot save".into()));
            }
            writer.write_field(Tag::Name, self.label.as_str())?;
            writer.write(self.delay_ms)
        }

        fn load<R: TreeReader>(_type_name: &str, reader: &mut R) -> CursorResult<Self> {
            Ok(Self {
                label: reader.read_field(Tag::Name)?,
                delay_ms: reader.read()?,
            })
        }
    }

    fn slow_chips(n: u64) -> Vec<Slow> {
        (0..n)
            .map(|i| Slow {
                delay_ms: (n - i) * 15,
                label: format!("chip-{i}"),
            })
            .collect()
    }

    #[test]
    fn splices_in_chip_order_not_completion_order() {
        let chips = slow_chips(6);
        let registry = ChipTypeRegistry::new();
        let mut saver = BinarySaver::new(SaveOptions::default());
        save_chips(&mut saver, &chips, &registry, &ChipSaveOptions::with_threads(6)).unwrap();
        assert_eq!(registry.count("Slow"), 6);
        let bytes = saver.save_to_memory().unwrap();

        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        let loaded: Vec<Slow> = load_chips(&mut loader, &ChipTypeRegistry::new()).unwrap();
        assert_eq!(loaded, chips);
    }

    #[test]
    fn ids_follow_chip_order() {
        let chips = slow_chips(4);
        let mut saver = TextSaver::new(TextEncoding::Xml, TextOptions::default());
        save_chips(&mut saver, &chips, &ChipTypeRegistry::new(), &ChipSaveOptions::default()).unwrap();
        let text = saver.save_to_string().unwrap();

        let mut loader = TextLoader::open_str(&text, TextEncoding::Xml).unwrap();
        loader.enter_group(Tag::Chips).unwrap();
        loader.enter_group_keyed(Tag::Chip, Tag::Id, "2").unwrap();
        assert_eq!(loader.read_field::<String>(Tag::Name).unwrap(), "chip-2");
    }

    #[test]
    fn lowest_failing_chip_is_reported() {
        let mut chips = slow_chips(5);
        chips[3].label = "broken".into();
        chips[1].label = "broken".into();
        let registry = ChipTypeRegistry::new();
        let mut saver = BinarySaver::new(SaveOptions::default());
        let err = save_chips(&mut saver, &chips, &registry, &ChipSaveOptions::with_threads(2)).unwrap_err();
        assert!(matches!(err, ChipError::Chip { index: 1, .. }));
        assert!(!err.is_integrity());
        // the other chips still ran
        assert_eq!(registry.count("Slow"), 3);
    }

    #[test]
    fn empty_chip_list() {
        let mut saver = BinarySaver::new(SaveOptions::default());
        save_chips::<_, Slow>(&mut saver, &[], &ChipTypeRegistry::new(), &ChipSaveOptions::default())
            .unwrap();
        let bytes = saver.save_to_memory().unwrap();
        let mut loader = BinaryLoader::open_memory(&bytes, &OpenOptions::default()).unwrap();
        let loaded: Vec<Slow> = load_chips(&mut loader, &ChipTypeRegistry::new()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn load_failure_names_the_chip() {
        let mut saver = TextSaver::new(TextEncoding::Json, TextOptions::default());
        saver.push_group(Tag::Chips).unwrap();
        saver.push_group(Tag::Chip).unwrap();
        saver.write_attr(Tag::Type, "Slow").unwrap();
        saver.pop_group(Tag::Chip).unwrap();
        saver.pop_group(Tag::Chips).unwrap();
        let text = saver.save_to_string().unwrap();

        let mut loader = TextLoader::open_str(&text, TextEncoding::Json).unwrap();
        let err = load_chips::<_, Slow>(&mut loader, &ChipTypeRegistry::new()).unwrap_err();
        assert!(matches!(err, ChipError::Chip { index: 0, .. }));
    }
}
