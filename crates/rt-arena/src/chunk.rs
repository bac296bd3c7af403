//! A single contiguous, page-aligned region backing part of an [`crate::Arena`].

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::ArenaError;

enum Backing {
    /// Page-aligned allocation from the process heap.
    Heap { ptr: NonNull<u8>, layout: Layout },
    /// Page-reserved region obtained from the host virtual memory manager.
    #[cfg(unix)]
    Virtual { ptr: NonNull<u8>, len: usize },
}

/// A fixed-size, page-aligned block of memory served by bump allocation.
pub(crate) struct Chunk {
    backing: Backing,
    capacity: usize,
    cursor: usize,
}

impl Chunk {
    pub(crate) fn new_heap(capacity: usize, page_size: usize) -> Result<Self, ArenaError> {
        let layout =
            Layout::from_size_align(capacity, page_size).map_err(|_| ArenaError::SizeOverflow)?;
        // SAFETY: layout has non-zero size (validated by callers before
        // reaching here) and a valid alignment computed from `page_size`.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(ArenaError::OutOfMemory)?;
        Ok(Self {
            backing: Backing::Heap { ptr, layout },
            capacity,
            cursor: 0,
        })
    }

    #[cfg(unix)]
    pub(crate) fn new_virtual(capacity: usize) -> Result<Self, ArenaError> {
        // SAFETY: mmap with MAP_ANONYMOUS ignores the fd/offset arguments;
        // the returned mapping is private to this process and sized exactly
        // `capacity` bytes, page-aligned by the kernel.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(ArenaError::OutOfMemory);
        }
        // SAFETY: mmap returned a non-null pointer (checked above).
        let ptr = unsafe { NonNull::new_unchecked(raw.cast::<u8>()) };
        Ok(Self {
            backing: Backing::Virtual { ptr, len: capacity },
            capacity,
            cursor: 0,
        })
    }

    pub(crate) fn base_ptr(&self) -> *mut u8 {
        match &self.backing {
            Backing::Heap { ptr, .. } => ptr.as_ptr(),
            #[cfg(unix)]
            Backing::Virtual { ptr, .. } => ptr.as_ptr(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        debug_assert!(cursor <= self.capacity);
        self.cursor = cursor;
    }

    /// Bump the cursor to `new_cursor`, returning a pointer to the start of
    /// the newly-claimed region.
    pub(crate) fn bump(&mut self, new_cursor: usize) -> *mut u8 {
        debug_assert!(new_cursor <= self.capacity);
        let start = self.cursor;
        self.cursor = new_cursor;
        // SAFETY: `start` is within [0, capacity] by the invariant callers
        // maintain on `cursor`/`new_cursor`.
        unsafe { self.base_ptr().add(start) }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        match &self.backing {
            Backing::Heap { ptr, layout } => {
                // SAFETY: `ptr` was allocated with this exact `layout` in
                // `new_heap` and is not deallocated anywhere else.
                unsafe { dealloc(ptr.as_ptr(), *layout) };
            }
            #[cfg(unix)]
            Backing::Virtual { ptr, len } => {
                // SAFETY: `ptr` was obtained from `mmap` with length `len`
                // in `new_virtual` and is not unmapped anywhere else.
                unsafe {
                    libc::munmap(ptr.as_ptr().cast(), *len);
                }
            }
        }
    }
}

// SAFETY: a Chunk owns its backing memory exclusively; sharing it across
// threads is the arena's (and ultimately the host's) responsibility, not a
// property of the raw allocation itself.
unsafe impl Send for Chunk {}

/// A handle to a byte range carved out of an arena chunk.
///
/// `Region` carries no lifetime tied to the arena: the arena is a bump
/// allocator, and pinning a borrow to every live region would make it
/// impossible to call `allocate` again while a prior region is in scope.
/// Instead the validity contract is temporal and by convention, mirroring
/// the arena's own reclamation model: a `Region` is valid to dereference
/// only until the arena chunk backing it is released by `reset` or
/// `reset_to`. Dereferencing a region past that point is undefined
/// behavior; the host is expected to enforce this the same way it enforces
/// any other bump-allocator contract (scoping, generation tagging, or
/// simply program order).
#[derive(Debug, Clone, Copy)]
pub struct Region {
    ptr: *mut u8,
    len: usize,
}

impl Region {
    pub(crate) fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// View the region as a byte slice.
    ///
    /// # Safety
    /// The caller must ensure the owning arena has not been reset (via
    /// `reset` or `reset_to` past this region's marker) since this region
    /// was allocated, and that no other mutable view of this range is live.
    pub unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.ptr, self.len)
    }

    /// View the region as a mutable byte slice.
    ///
    /// # Safety
    /// Same contract as [`Region::as_slice`], plus exclusivity: the caller
    /// must ensure no other live view of this range exists.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

// SAFETY: Region is a bare pointer+len pair; sending it across threads is
// sound, the unsafety is entirely in dereferencing it (see `as_slice`).
unsafe impl Send for Region {}
