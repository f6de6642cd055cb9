use chipdoc_types::{Tag, Value};

use crate::convert::FromValue;
use crate::error::CursorResult;

/// Write side of the tree cursor protocol.
///
/// Every `push_group` must be matched by a `pop_group` with the same tag.
/// A saver's root group is pushed by its constructor and closed when the
/// document is saved.
pub trait TreeWriter {
    /// Open a new child group of the current group.
    fn push_group(&mut self, tag: Tag) -> CursorResult<()>;

    /// Close the current group. Fails if nothing is open or the open group
    /// is not tagged `tag`.
    fn pop_group(&mut self, tag: Tag) -> CursorResult<()>;

    /// Append a `Data` leaf holding `value` to the current group.
    fn write_data(&mut self, value: Value) -> CursorResult<()>;

    /// Attach `value` to the current group as attribute `key`.
    fn write_attribute(&mut self, key: Tag, value: Value) -> CursorResult<()>;

    /// Number of open groups.
    fn depth(&self) -> usize;

    /// Write `value` as the content of a child group tagged `tag`.
    fn write_field(&mut self, tag: Tag, value: impl Into<Value>) -> CursorResult<()>
    where
        Self: Sized,
    {
        self.push_group(tag)?;
        self.write_data(value.into())?;
        self.pop_group(tag)
    }

    fn write(&mut self, value: impl Into<Value>) -> CursorResult<()>
    where
        Self: Sized,
    {
        self.write_data(value.into())
    }

    fn write_attr(&mut self, key: Tag, value: impl Into<Value>) -> CursorResult<()>
    where
        Self: Sized,
    {
        self.write_attribute(key, value.into())
    }
}

/// Read side of the tree cursor protocol.
///
/// The loader starts with the document root open. Each open group remembers
/// the last child group that was left and which children have been visited,
/// so repeated non-keyed `enter_group` calls enumerate same-tagged siblings
/// once each, in document order. Re-entering a group resets that state.
pub trait TreeReader {
    /// Enter the next unvisited child group tagged `tag`, scanning forward
    /// from the last group left and wrapping once to the first child.
    fn enter_group(&mut self, tag: Tag) -> CursorResult<()>;

    /// Enter the first child group tagged `tag` whose `key` attribute (or
    /// `key` field) renders as `value`.
    fn enter_group_keyed(&mut self, tag: Tag, key: Tag, value: &str) -> CursorResult<()>;

    /// Leave the current group. Fails at the root or if the open group is
    /// not tagged `tag`.
    fn leave_group(&mut self, tag: Tag) -> CursorResult<()>;

    /// Whether the open group is tagged `tag`. Does not move the cursor.
    fn verify_group(&self, tag: Tag) -> bool;

    fn current_tag(&self) -> Option<Tag>;

    /// Number of open groups, including the root.
    fn depth(&self) -> usize;

    /// Read the next unread `Data` leaf of the open group.
    fn read_data(&mut self) -> CursorResult<Value>;

    /// Read attribute `key` of the open group, falling back to the content
    /// of a child group tagged `key`.
    fn read_attribute(&mut self, key: Tag) -> CursorResult<Value>;

    /// Tags of the open group's children in document order (`Data` for leaves).
    fn children(&mut self) -> CursorResult<Vec<Tag>>;

    /// Attribute keys of the open group.
    fn attribute_keys(&mut self) -> CursorResult<Vec<Tag>>;

    fn read<T: FromValue>(&mut self) -> CursorResult<T>
    where
        Self: Sized,
    {
        T::from_value(self.read_data()?)
    }

    /// Enter the next `tag` group, read its content, and leave it.
    fn read_field<T: FromValue>(&mut self, tag: Tag) -> CursorResult<T>
    where
        Self: Sized,
    {
        self.enter_group(tag)?;
        let value = self.read()?;
        self.leave_group(tag)?;
        Ok(value)
    }

    fn read_attr<T: FromValue>(&mut self, key: Tag) -> CursorResult<T>
    where
        Self: Sized,
    {
        T::from_value(self.read_attribute(key)?)
    }

    /// Number of child groups tagged `tag`.
    fn count_groups(&mut self, tag: Tag) -> CursorResult<usize> {
        Ok(self.children()?.into_iter().filter(|t| *t == tag).count())
    }
}

/// A writer that can fork isolated sub-writers and splice their output back.
///
/// A fork shares no tree state with its parent: it owns its own buffer and
/// group stack, so forks can run on different threads. Splicing appends a
/// finished fragment as children of the parent's open group.
pub trait SubtreeWriter: TreeWriter + Sized {
    type Fragment: Send;

    /// A fresh, empty writer with the same options and no open groups.
    fn fork(&self) -> Self;

    /// The completed top-level groups written to a fork. Fails if any group
    /// is still open.
    fn into_fragment(self) -> CursorResult<Self::Fragment>;

    /// Append `fragment` to the currently open group.
    fn splice(&mut self, fragment: Self::Fragment) -> CursorResult<()>;
}
