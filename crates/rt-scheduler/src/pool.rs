//! Pre-allocated slot table for job records, addressed by generation-tagged
//! identifiers.

use crate::error::PoolConfigError;
use crate::job::{JobId, JobRecord};

enum Slot {
    Free {
        next_free: Option<u32>,
        generation: u32,
    },
    Occupied {
        generation: u32,
        record: JobRecord,
    },
}

/// A fixed-capacity table of job records with an intrusive free list and
/// generation-tagged identifiers: freeing a slot bumps its generation, so a
/// lookup with the identifier issued before the free returns `None` rather
/// than aliasing whatever was allocated into the slot afterward.
pub(crate) struct JobPool {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    capacity: u32,
}

impl JobPool {
    pub(crate) fn new(capacity: u32) -> Result<Self, PoolConfigError> {
        if capacity == 0 {
            return Err(PoolConfigError::CapacityZero);
        }
        if !capacity.is_power_of_two() {
            return Err(PoolConfigError::CapacityNotPowerOfTwo(capacity));
        }
        let mut slots = Vec::with_capacity(capacity as usize);
        for index in 0..capacity {
            let next_free = if index + 1 < capacity {
                Some(index + 1)
            } else {
                None
            };
            // Slot 0 starts at generation 1 so the all-zero JobId (index 0,
            // generation 0) is never handed out, keeping it a safe NONE
            // sentinel.
            let generation = if index == 0 { 1 } else { 0 };
            slots.push(Slot::Free {
                next_free,
                generation,
            });
        }
        Ok(Self {
            slots,
            free_head: Some(0),
            capacity,
        })
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    pub(crate) fn try_allocate(&mut self, record: JobRecord) -> Option<JobId> {
        let index = self.free_head?;
        let (next_free, generation) = match self.slots[index as usize] {
            Slot::Free {
                next_free,
                generation,
            } => (next_free, generation),
            Slot::Occupied { .. } => unreachable!("free list pointed at an occupied slot"),
        };
        self.free_head = next_free;
        self.slots[index as usize] = Slot::Occupied { generation, record };
        Some(JobId::new(index, generation))
    }

    /// Release `id`'s slot back to the pool, bumping its generation. Returns
    /// `false` if `id` does not currently address an occupied slot (already
    /// freed, out of range, or stale).
    pub(crate) fn free(&mut self, id: JobId) -> bool {
        let index = id.index();
        if index >= self.capacity {
            return false;
        }
        match self.slots[index as usize] {
            Slot::Occupied { generation, .. } if generation == id.generation() => {
                let mut next_generation = generation.wrapping_add(1);
                if index == 0 && next_generation == 0 {
                    next_generation = 1;
                }
                self.slots[index as usize] = Slot::Free {
                    next_free: self.free_head,
                    generation: next_generation,
                };
                self.free_head = Some(index);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, id: JobId) -> Option<&JobRecord> {
        let index = id.index();
        if index >= self.capacity {
            return None;
        }
        match &self.slots[index as usize] {
            Slot::Occupied { generation, record } if *generation == id.generation() => Some(record),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: JobId) -> Option<&mut JobRecord> {
        let index = id.index();
        if index >= self.capacity {
            return None;
        }
        match &mut self.slots[index as usize] {
            Slot::Occupied { generation, record } if *generation == id.generation() => Some(record),
            _ => None,
        }
    }

    /// Reconstruct the current, valid `JobId` for an occupied slot index —
    /// used when walking `first_child`/`next_sibling` links, which store
    /// bare indices rather than full identifiers.
    pub(crate) fn id_at(&self, index: u32) -> Option<JobId> {
        match self.slots.get(index as usize)? {
            Slot::Occupied { generation, .. } => Some(JobId::new(index, *generation)),
            Slot::Free { .. } => None,
        }
    }
}
