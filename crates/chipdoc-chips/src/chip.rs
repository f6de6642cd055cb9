use chipdoc_tree::{CursorResult, TreeReader, TreeWriter};
use chipdoc_types::Tag;
use serde::{Deserialize, Serialize};

/// A chip that can write itself into, and read itself from, a `Chip` group.
///
/// `save` runs against an isolated sub-writer, possibly on a worker thread,
/// with the `Chip` group already open and its `Type` and `Id` attributes
/// written. `load` runs with the same group entered.
pub trait ChipSerialize: Sized + Send + Sync {
    /// Name recorded as the chip's `Type` attribute and in the type registry.
    fn type_name(&self) -> &str;

    fn save<W: TreeWriter>(&self, writer: &mut W) -> CursorResult<()>;

    fn load<R: TreeReader>(type_name: &str, reader: &mut R) -> CursorResult<Self>;
}

/// A wire from output pin `output` of chip `source` to input pin `input` of
/// chip `target`. Chips are referenced by their index in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: u32,
    pub output: u32,
    pub target: u32,
    pub input: u32,
}

impl Connection {
    pub fn new(source: u32, output: u32, target: u32, input: u32) -> Self {
        Self {
            source,
            output,
            target,
            input,
        }
    }

    /// `Connection > Source(chip, pin) Target(chip, pin)`
    pub fn save<W: TreeWriter>(&self, writer: &mut W) -> CursorResult<()> {
        writer.push_group(Tag::Connection)?;
        writer.push_group(Tag::Source)?;
        writer.write(self.source)?;
        writer.write(self.output)?;
        writer.pop_group(Tag::Source)?;
        writer.push_group(Tag::Target)?;
        writer.write(self.target)?;
        writer.write(self.input)?;
        writer.pop_group(Tag::Target)?;
        writer.pop_group(Tag::Connection)
    }

    /// Read the next `Connection` group of the open group.
    pub fn load<R: TreeReader>(reader: &mut R) -> CursorResult<Self> {
        reader.enter_group(Tag::Connection)?;
        reader.enter_group(Tag::Source)?;
        let source = reader.read()?;
        let output = reader.read()?;
        reader.leave_group(Tag::Source)?;
        reader.enter_group(Tag::Target)?;
        let target = reader.read()?;
        let input = reader.read()?;
        reader.leave_group(Tag::Target)?;
        reader.leave_group(Tag::Connection)?;
        Ok(Self {
            source,
            output,
            target,
            input,
        })
    }
}
