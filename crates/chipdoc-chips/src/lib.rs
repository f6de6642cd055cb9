//! Chip documents.
//!
//! - [`ChipSerialize`]: how one chip writes and reads its own subtree.
//! - [`save_chips`] / [`load_chips`]: the `Chips` group, serialized in
//!   parallel through forked sub-writers and spliced back in chip order.
//! - [`ChipTypeRegistry`]: chip type names seen during a save or load,
//!   behind a read-write lock shared by the workers.
//! - [`ChipDocument`]: chips, [`Connection`]s and a comment, saved to and
//!   loaded from any tree back end.

pub mod chip;
pub mod document;
pub mod error;
pub mod parallel;
pub mod registry;

pub use chip::{ChipSerialize, Connection};
pub use document::ChipDocument;
pub use error::{ChipError, ChipResult};
pub use parallel::{load_chips, save_chips, ChipSaveOptions};
pub use registry::ChipTypeRegistry;
