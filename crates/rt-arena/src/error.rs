//! Error types for arena construction and allocation.

/// Errors reported synchronously when constructing a [`crate::Arena`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("alignment {0} must be a non-zero power of two")]
    InvalidAlignment(usize),

    #[error("alignment {alignment} exceeds host page size {page_size}")]
    AlignmentExceedsPageSize { alignment: usize, page_size: usize },

    #[error("chunk_size {chunk_size} must be greater than alignment {alignment}")]
    InvalidChunkSize { chunk_size: usize, alignment: usize },

    #[error("failed to acquire the arena's initial chunk: {0}")]
    InitialChunkAllocationFailed(#[from] super::error::ArenaError),
}

/// Errors reported by [`crate::Arena::allocate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("length must be > 0")]
    InvalidLength,

    #[error("alignment {0} must be a non-zero power of two")]
    InvalidAlignment(usize),

    #[error("alignment {alignment} exceeds host page size {page_size}")]
    AlignmentExceedsPageSize { alignment: usize, page_size: usize },

    #[error("requested size overflows the host address space")]
    SizeOverflow,

    #[error("arena is exhausted and not growable")]
    OutOfMemory,
}
