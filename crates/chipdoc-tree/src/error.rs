use chipdoc_types::{FormatVersion, Tag, TypeError, ValueKind};

use crate::envelope::EnvelopeError;

/// Errors from tree cursor operations.
///
/// Structural errors (nesting, missing groups, wrong types) are programmer or
/// schema errors; the caller aborts the whole load/save on the first one.
/// Integrity errors mean the underlying bytes or text are damaged.
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("no group is open")]
    StackEmpty,

    #[error("tag mismatch: expected {expected}, open group is {found}")]
    TagMismatch { expected: Tag, found: Tag },

    #[error("cannot leave the root group")]
    AtRoot,

    #[error("tag {0} is reserved for leaves and cannot open a group")]
    ReservedTag(Tag),

    #[error("{0} group(s) still open")]
    Unbalanced(usize),

    #[error("no remaining {tag} group under {parent}")]
    GroupNotFound { parent: Tag, tag: Tag },

    #[error("no {tag} group under {parent} with {key} = {value:?}")]
    KeyNotFound {
        parent: Tag,
        tag: Tag,
        key: Tag,
        value: String,
    },

    #[error("no remaining data under {0}")]
    MissingData(Tag),

    #[error("{parent} has no attribute or field {key}")]
    MissingAttribute { parent: Tag, key: Tag },

    #[error("wrong value type: expected {expected}, found {found}")]
    WrongType { expected: ValueKind, found: ValueKind },

    #[error("cannot parse {expected} from {text:?}")]
    Parse { expected: ValueKind, text: String },

    #[error("tag {tag} cannot be represented in format {version}")]
    Unrepresentable { tag: Tag, version: FormatVersion },

    #[error("raw blob envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("corrupt tree at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("malformed text document: {0}")]
    Malformed(String),

    #[error("cannot encode document: {0}")]
    Encode(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CursorError {
    /// Damaged bytes or text, as opposed to a structural misuse.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::Envelope(_) | Self::Corrupt { .. } | Self::Malformed(_) | Self::Type(_)
        )
    }
}

pub type CursorResult<T> = Result<T, CursorError>;
