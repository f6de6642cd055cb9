use chipdoc_tree::CursorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChipError {
    /// One chip failed; the lowest failing index is reported.
    #[error("chip {index} ({type_name}): {source}")]
    Chip {
        index: usize,
        type_name: String,
        #[source]
        source: CursorError,
    },

    #[error("connection {index} refers to chip {chip}, but the document has {chips} chips")]
    DanglingConnection {
        index: usize,
        chip: u32,
        chips: usize,
    },

    #[error("chip index {0} does not fit in a connection reference")]
    TooManyChips(usize),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

impl ChipError {
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Chip { source, .. } | Self::Cursor(source) => source.is_integrity(),
            Self::DanglingConnection { .. } => true,
            Self::TooManyChips(_) | Self::Pool(_) => false,
        }
    }
}

pub type ChipResult<T> = Result<T, ChipError>;
