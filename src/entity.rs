// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Entity handles and the generational handle pool.
//!
//! A handle is valid while its generation equals the one stored for its slot.
//! Releasing a slot bumps that generation, which invalidates every handle
//! issued before the release.
//!
//! Generations are `u32` and wrap on overflow: after 2^32 releases of the same
//! slot a very old handle can alias a live one. This is a known limit.

use std::fmt;

/// Generational entity handle
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    slot: u32,
    generation: u32,
}

impl Entity {
    /// Sentinel that never refers to a live entity
    pub const NULL: Entity = Entity {
        slot: u32::MAX,
        generation: u32::MAX,
    };

    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub(crate) fn index(&self) -> usize {
        self.slot as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.slot, self.generation)
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

/// Allocates and recycles entity handles
#[derive(Debug, Default)]
pub struct HandlePool {
    generations: Vec<u32>,
    free: Vec<u32>,
    live: usize,
}

impl HandlePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Hand out a handle, reusing the most recently freed slot first.
    pub fn acquire(&mut self) -> Entity {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            return Entity::new(slot, self.generations[slot as usize]);
        }
        let slot = self.generations.len() as u32;
        self.generations.push(0);
        Entity::new(slot, 0)
    }

    /// Return a handle's slot to the pool.
    ///
    /// Returns `false` and does nothing when the handle is already stale.
    pub fn release(&mut self, entity: Entity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }
        let generation = &mut self.generations[entity.index()];
        *generation = generation.wrapping_add(1);
        self.free.push(entity.slot);
        self.live -= 1;
        true
    }

    /// O(1) staleness check
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.generations.get(entity.index()) == Some(&entity.generation)
            && !entity.is_null()
    }

    /// Number of handles currently issued
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated
    pub fn slots(&self) -> usize {
        self.generations.len()
    }

    /// Current generation stored for `slot`
    pub fn generation_of(&self, slot: u32) -> Option<u32> {
        self.generations.get(slot as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_sequential_slots() {
        let mut pool = HandlePool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(a.slot(), 0);
        assert_eq!(b.slot(), 1);
        assert_eq!(pool.live(), 2);
    }

    #[test]
    fn test_release_invalidates_and_recycles() {
        let mut pool = HandlePool::new();
        let old = pool.acquire();
        assert!(pool.release(old));
        assert!(!pool.is_valid(old));

        let new = pool.acquire();
        assert_eq!(new.slot(), old.slot());
        assert_ne!(new.generation(), old.generation());
        assert!(pool.is_valid(new));
        assert!(!pool.is_valid(old));
    }

    #[test]
    fn test_release_stale_is_noop() {
        let mut pool = HandlePool::new();
        let e = pool.acquire();
        assert!(pool.release(e));
        assert!(!pool.release(e));
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.generation_of(e.slot()), Some(1));
    }

    #[test]
    fn test_null_is_never_valid() {
        let mut pool = HandlePool::new();
        pool.acquire();
        assert!(!pool.is_valid(Entity::NULL));
        assert!(!pool.is_valid(Entity::new(42, 0)));
    }

    #[test]
    fn test_generation_wraps() {
        let mut pool = HandlePool::new();
        let e = pool.acquire();
        pool.generations[0] = u32::MAX - 1;
        let e = Entity::new(e.slot(), u32::MAX - 1);
        assert!(pool.release(e));
        assert_eq!(pool.generation_of(0), Some(u32::MAX));
        let e = pool.acquire();
        assert!(pool.release(e));
        assert_eq!(pool.generation_of(0), Some(0));
    }
}
