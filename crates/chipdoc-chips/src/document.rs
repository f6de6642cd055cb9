use chipdoc_tree::{CursorError, FromValue, SubtreeWriter, TreeReader, TreeWriter};
use chipdoc_types::Tag;
use tracing::{debug, warn};

use crate::chip::{ChipSerialize, Connection};
use crate::error::{ChipError, ChipResult};
use crate::parallel::{load_chips, save_chips, ChipSaveOptions};
use crate::registry::ChipTypeRegistry;

/// A circuit: chips, the connections between them, and an optional comment.
///
/// Saved as `Document > [Comment] Chips Connections Types`. The type registry
/// is rebuilt on every save and load.
#[derive(Clone, Debug)]
pub struct ChipDocument<C> {
    pub chips: Vec<C>,
    pub connections: Vec<Connection>,
    pub comment: Option<String>,
    pub types: ChipTypeRegistry,
}

impl<C> Default for ChipDocument<C> {
    fn default() -> Self {
        Self {
            chips: Vec::new(),
            connections: Vec::new(),
            comment: None,
            types: ChipTypeRegistry::new(),
        }
    }
}

impl<C: ChipSerialize> ChipDocument<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Append a chip and return its index.
    pub fn add_chip(&mut self, chip: C) -> ChipResult<u32> {
        let index = chip_index(self.chips.len())?;
        self.chips.push(chip);
        Ok(index)
    }

    pub fn connect(&mut self, connection: Connection) -> ChipResult<()> {
        check_connection(self.connections.len(), &connection, self.chips.len())?;
        self.connections.push(connection);
        Ok(())
    }

    /// Write the document into a saver whose root group is open.
    pub fn save<W: SubtreeWriter + Send>(
        &self,
        writer: &mut W,
        options: &ChipSaveOptions,
    ) -> ChipResult<()> {
        if let Some(comment) = &self.comment {
            writer.write_attr(Tag::Comment, comment.as_str())?;
        }
        self.types.clear();
        save_chips(writer, &self.chips, &self.types, options)?;

        writer.push_group(Tag::Connections)?;
        for connection in &self.connections {
            connection.save(writer)?;
        }
        writer.pop_group(Tag::Connections)?;

        self.types.save(writer)?;
        debug!(
            chips = self.chips.len(),
            connections = self.connections.len(),
            types = self.types.len(),
            "chip document saved"
        );
        Ok(())
    }

    /// Read a document from a loader positioned at the root.
    ///
    /// A stored `Types` group is only cross-checked: the registry always
    /// reflects the chips actually loaded. Documents without one (version 1)
    /// load the same way.
    pub fn load<R: TreeReader>(reader: &mut R) -> ChipResult<Self> {
        let comment = match reader.read_attribute(Tag::Comment) {
            Ok(value) => Some(String::from_value(value)?),
            Err(CursorError::MissingAttribute { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let types = ChipTypeRegistry::new();
        let chips: Vec<C> = load_chips(reader, &types)?;

        let mut connections = Vec::new();
        if reader.count_groups(Tag::Connections)? > 0 {
            reader.enter_group(Tag::Connections)?;
            for index in 0..reader.count_groups(Tag::Connection)? {
                let connection = Connection::load(reader)?;
                check_connection(index, &connection, chips.len())?;
                connections.push(connection);
            }
            reader.leave_group(Tag::Connections)?;
        }

        if reader.count_groups(Tag::Types)? > 0 {
            let stored = ChipTypeRegistry::load(reader)?;
            if stored != types {
                warn!(
                    stored = stored.len(),
                    loaded = types.len(),
                    "stored chip type registry does not match the chips"
                );
            }
        }

        debug!(chips = chips.len(), connections = connections.len(), "chip document loaded");
        Ok(Self {
            chips,
            connections,
            comment,
            types,
        })
    }
}

/// Connections address chips by `u32`.
fn chip_index(position: usize) -> ChipResult<u32> {
    u32::try_from(position).map_err(|_| ChipError::TooManyChips(position))
}

fn check_connection(index: usize, connection: &Connection, chips: usize) -> ChipResult<()> {
    for chip in [connection.source, connection.target] {
        if chip as usize >= chips {
            return Err(ChipError::DanglingConnection { index, chip, chips });
        }
    }
    Ok(())
}
