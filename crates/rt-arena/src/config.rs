//! Arena construction configuration.

use crate::error::ConfigError;

/// The default alignment, in bytes, for memory returned from an [`crate::Arena`].
pub const DEFAULT_ALIGNMENT: usize = 16;

/// Access mode for memory served by an arena.
///
/// `ReadOnly` is design-reserved for a future freeze-point contract (an arena
/// that rejects `allocate` past a certain point and only serves read-only
/// views of already-committed regions). The current contract exposes only
/// `ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    ReadWrite,
}

/// Construction parameters for an [`crate::Arena`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Size, in bytes, of each chunk. Must be greater than `alignment`.
    pub chunk_size: usize,
    /// Desired alignment of the first addressable byte of any region
    /// returned by `allocate` when no per-call alignment is given. Must be a
    /// non-zero power of two no greater than the host page size.
    pub alignment: usize,
    /// Serve chunks from the host virtual memory manager (`mmap` on unix)
    /// rather than the process heap.
    pub virtual_memory: bool,
    /// Allow the arena to acquire additional chunks beyond the first.
    pub growable: bool,
    /// Debug-only name, used in log lines.
    pub name: Option<String>,
    /// Debug-only tag, used in log lines.
    pub tag: Option<String>,
    access: Access,
}

impl Config {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            alignment: DEFAULT_ALIGNMENT,
            virtual_memory: false,
            growable: true,
            name: None,
            tag: None,
            access: Access::ReadWrite,
        }
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_virtual_memory(mut self, virtual_memory: bool) -> Self {
        self.virtual_memory = virtual_memory;
        self
    }

    pub fn with_growable(mut self, growable: bool) -> Self {
        self.growable = growable;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub(crate) fn validate(&self, page_size: usize) -> Result<(), ConfigError> {
        if self.alignment == 0 || !self.alignment.is_power_of_two() {
            return Err(ConfigError::InvalidAlignment(self.alignment));
        }
        if self.alignment > page_size {
            return Err(ConfigError::AlignmentExceedsPageSize {
                alignment: self.alignment,
                page_size,
            });
        }
        if self.chunk_size <= self.alignment {
            return Err(ConfigError::InvalidChunkSize {
                chunk_size: self.chunk_size,
                alignment: self.alignment,
            });
        }
        Ok(())
    }
}
