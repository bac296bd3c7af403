//! A growable, fixed-chunk memory arena with marker-based bulk reclamation.
//!
//! An [`Arena`] serves allocations by bumping a cursor through one or more
//! fixed-size chunks. There is no per-allocation free: memory is given back
//! only in bulk, by rewinding the arena to a [`Marker`] captured earlier
//! with [`Arena::mark`], or by resetting it entirely with [`Arena::reset`].
//! This trades individual-object lifetime tracking for allocation speed and
//! predictable, O(1) bulk reclamation — a fit for per-frame, per-request, or
//! per-job scratch memory.

mod arena;
mod chunk;
mod config;
mod emit;
mod error;
mod marker;

pub use arena::Arena;
pub use chunk::Region;
pub use config::{Access, Config, DEFAULT_ALIGNMENT};
pub use error::{ArenaError, ConfigError};
pub use marker::Marker;
