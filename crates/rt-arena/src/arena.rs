//! Bump-pointer memory arena with marker-based bulk reclamation.

use log::{debug, trace};

use crate::chunk::{Chunk, Region};
use crate::config::Config;
use crate::emit::log_tsv;
use crate::error::{ArenaError, ConfigError};
use crate::marker::Marker;

#[cfg(unix)]
fn host_page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE has no preconditions and never
    // fails on a sane host; it is documented to return -1 only for
    // unsupported `name` values, which this is not.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size > 0 {
        page_size as usize
    } else {
        4096
    }
}

#[cfg(not(unix))]
fn host_page_size() -> usize {
    4096
}

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// A growable, fixed-chunk memory arena that serves allocations by bumping a
/// cursor and reclaims them in bulk via [`Arena::mark`] / [`Arena::reset_to`].
///
/// Individual allocations are never freed on their own; the only way to
/// give memory back is to roll the whole arena back to an earlier marker,
/// or reset it entirely.
pub struct Arena {
    config: Config,
    page_size: usize,
    chunks: Vec<Chunk>,
}

impl Arena {
    /// Construct a new arena, eagerly allocating its first chunk.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let page_size = host_page_size();
        config.validate(page_size)?;

        let mut arena = Self {
            config,
            page_size,
            chunks: Vec::new(),
        };
        let first = arena.new_chunk(arena.config.chunk_size)?;
        arena.chunks.push(first);
        debug!(
            "{}",
            log_tsv(&[
                ("event", "arena_create"),
                ("name", arena.config.name.as_deref().unwrap_or("-")),
                ("tag", arena.config.tag.as_deref().unwrap_or("-")),
                ("chunk_size", &arena.config.chunk_size.to_string()),
                ("virtual_memory", &arena.config.virtual_memory.to_string()),
            ])
        );
        Ok(arena)
    }

    fn new_chunk(&self, capacity: usize) -> Result<Chunk, ArenaError> {
        if self.config.virtual_memory {
            #[cfg(unix)]
            {
                Chunk::new_virtual(capacity)
            }
            #[cfg(not(unix))]
            {
                Chunk::new_heap(capacity, self.page_size)
            }
        } else {
            Chunk::new_heap(capacity, self.page_size)
        }
    }

    /// Allocate `length` bytes, aligned to `alignment` (or the arena's
    /// configured default alignment when `alignment` is `None`).
    pub fn allocate(&mut self, length: usize, alignment: Option<usize>) -> Result<Region, ArenaError> {
        if length == 0 {
            return Err(ArenaError::InvalidLength);
        }
        let alignment = alignment.unwrap_or(self.config.alignment);
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment(alignment));
        }
        if alignment > self.page_size {
            return Err(ArenaError::AlignmentExceedsPageSize {
                alignment,
                page_size: self.page_size,
            });
        }

        if let Some(region) = self.try_allocate_in_current(length, alignment)? {
            return Ok(region);
        }

        if !self.config.growable {
            return Err(ArenaError::OutOfMemory);
        }

        let needed = align_up(length, self.page_size).ok_or(ArenaError::SizeOverflow)?;
        let chunk_size = self.config.chunk_size.max(needed);
        let chunk = self.new_chunk(chunk_size)?;
        self.chunks.push(chunk);
        trace!(
            "{}",
            log_tsv(&[
                ("event", "arena_grow"),
                ("name", self.config.name.as_deref().unwrap_or("-")),
                ("chunk_count", &self.chunks.len().to_string()),
                ("chunk_size", &chunk_size.to_string()),
            ])
        );

        self.try_allocate_in_current(length, alignment)?
            .ok_or(ArenaError::OutOfMemory)
    }

    /// Allocate using the arena's configured default alignment.
    pub fn allocate_default(&mut self, length: usize) -> Result<Region, ArenaError> {
        self.allocate(length, None)
    }

    fn try_allocate_in_current(
        &mut self,
        length: usize,
        alignment: usize,
    ) -> Result<Option<Region>, ArenaError> {
        let chunk = self.chunks.last_mut().expect("arena always has a chunk");
        let aligned_cursor = align_up(chunk.cursor(), alignment).ok_or(ArenaError::SizeOverflow)?;
        let end = aligned_cursor
            .checked_add(length)
            .ok_or(ArenaError::SizeOverflow)?;
        if end > chunk.capacity() {
            return Ok(None);
        }
        chunk.set_cursor(aligned_cursor);
        let ptr = chunk.bump(end);
        Ok(Some(Region::new(ptr, length)))
    }

    /// Capture the current allocation position.
    pub fn mark(&self) -> Marker {
        let chunk_index = self.chunks.len() - 1;
        let cursor = self.chunks[chunk_index].cursor();
        Marker { chunk_index, cursor }
    }

    /// Roll the arena back to a previously captured marker, releasing any
    /// chunks acquired after it and rewinding the cursor of the chunk it
    /// points into.
    ///
    /// Any `Region` handed out after `marker` was captured becomes
    /// dangling; dereferencing it afterward is the caller's mistake, by
    /// contract, not something this arena can prevent.
    pub fn reset_to(&mut self, marker: Marker) {
        assert!(
            marker.chunk_index < self.chunks.len(),
            "marker refers to a chunk index {} but arena only has {} chunks",
            marker.chunk_index,
            self.chunks.len()
        );
        assert!(
            marker.cursor <= self.chunks[marker.chunk_index].capacity(),
            "marker cursor {} exceeds chunk capacity",
            marker.cursor
        );
        self.chunks.truncate(marker.chunk_index + 1);
        self.chunks[marker.chunk_index].set_cursor(marker.cursor);
        trace!(
            "{}",
            log_tsv(&[
                ("event", "arena_reset_to"),
                ("name", self.config.name.as_deref().unwrap_or("-")),
                ("chunk_index", &marker.chunk_index.to_string()),
                ("cursor", &marker.cursor.to_string()),
            ])
        );
    }

    /// Reset the arena to its initial state, releasing every chunk beyond
    /// the first and rewinding it to empty.
    pub fn reset(&mut self) {
        self.reset_to(Marker {
            chunk_index: 0,
            cursor: 0,
        });
    }

    /// Total bytes currently committed across all live chunks.
    pub fn allocated_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::cursor).sum()
    }

    /// Number of chunks currently held by the arena.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
