//! Tree cursor protocol for chip documents.
//!
//! A chip document is a tree of tagged groups with ordered children, optional
//! attributes, and `Data` leaves. Every storage back end exposes the same
//! stateful cursor over that tree:
//!
//! - [`TreeWriter`]: `push_group` / `pop_group` with tag-matched nesting,
//!   `write_data` for content leaves and `write_attribute` for attributes.
//! - [`TreeReader`]: `enter_group` (ring scan over same-tagged siblings),
//!   `enter_group_keyed` (first child whose key attribute matches),
//!   `leave_group`, and typed reads through [`FromValue`].
//! - [`SubtreeWriter`]: isolated sub-writers whose output is spliced back
//!   into a parent, used for parallel chip serialization.
//!
//! This crate also provides the in-memory [`Element`] tree, the raw-blob
//! [`envelope`] used to embed binary payloads in text, and the two text back
//! ends ([`TextSaver`] / [`TextLoader`] over XML or JSON). The binary back end
//! lives in `chipdoc-pack`.

pub mod convert;
pub mod cursor;
pub mod element;
pub mod envelope;
pub mod error;
pub mod sibling;
pub mod text;

pub use convert::FromValue;
pub use cursor::{SubtreeWriter, TreeReader, TreeWriter};
pub use element::{read_element, write_children, write_element, Element, MAX_NESTING_DEPTH};
pub use envelope::EnvelopeError;
pub use error::{CursorError, CursorResult};
pub use sibling::SiblingCursor;
pub use text::{TextLoader, TextOptions, TextSaver};
