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

//! Budgeted linear arena
//!
//! An [`Arena`] hands out raw regions from a bump allocator and refuses any
//! reservation that would exceed its byte budget. Individual regions are never
//! freed; the whole arena is reclaimed at once with [`Arena::release`].
//!
//! The backing memory is allocated once, when the arena is created. The bump
//! allocator is then capped at that single chunk, so reservations never reach
//! the global allocator afterwards: a request that does not fit fails with
//! [`EcsError::ArenaExhausted`] instead of growing the arena.
//!
//! Arenas nest: [`Arena::root`] holds a budget without backing memory, and
//! [`Arena::slice`] carves a backed child out of it. This is how the stage
//! partitions its global budget between scene slots at boot.

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

use bumpalo::Bump;

use crate::error::{EcsError, Result};

/// Linear byte allocator with a hard budget
pub struct Arena {
    bump: Bump,
    budget: usize,
    used: Cell<usize>,
}

impl Arena {
    /// Create an arena backed by one pre-allocated chunk of `budget` bytes.
    pub fn new(budget: usize) -> Self {
        Self::with_bump(Bump::with_capacity(budget), budget)
    }

    /// Create a budget-only arena with no backing memory.
    ///
    /// It can only hand its budget out through [`Arena::slice`]; every
    /// [`Arena::reserve`] on it fails.
    pub fn root(budget: usize) -> Self {
        Self::with_bump(Bump::new(), budget)
    }

    fn with_bump(bump: Bump, budget: usize) -> Self {
        // No chunk beyond the ones that exist now
        bump.set_allocation_limit(Some(bump.allocated_bytes()));
        Self {
            bump,
            budget,
            used: Cell::new(0),
        }
    }

    /// Total byte budget
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Bytes reserved or sliced so far
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.budget - self.used.get()
    }

    /// Bytes of backing memory held from the global allocator
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    fn charge(&self, size: usize) -> Result<()> {
        let remaining = self.remaining();
        if size > remaining {
            return Err(EcsError::ArenaExhausted {
                requested: size,
                remaining,
            });
        }
        self.used.set(self.used.get() + size);
        Ok(())
    }

    /// Reserve a region for `layout`.
    ///
    /// Zero-sized layouts never touch the budget and return a dangling,
    /// well-aligned pointer.
    pub fn reserve(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            // Alignment is a non-zero power of two, so this is never null.
            return NonNull::new(layout.align() as *mut u8).ok_or(EcsError::ArenaExhausted {
                requested: 0,
                remaining: self.remaining(),
            });
        }

        self.charge(layout.size())?;
        self.bump.try_alloc_layout(layout).map_err(|_| {
            // Alignment padding can exhaust the chunk before the budget
            self.used.set(self.used.get() - layout.size());
            EcsError::ArenaExhausted {
                requested: layout.size(),
                remaining: self.remaining(),
            }
        })
    }

    /// Grow or shrink a region previously returned by [`Arena::reserve`].
    ///
    /// The old region stays consumed; its first `min(old, new)` bytes are
    /// copied into the fresh one.
    ///
    /// # Safety
    /// `ptr` must come from this arena with `old_layout`, and must not be used
    /// after this call.
    pub unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let new_layout = Layout::from_size_align(new_size, old_layout.align()).map_err(|_| {
            EcsError::ArenaExhausted {
                requested: new_size,
                remaining: self.remaining(),
            }
        })?;
        let fresh = self.reserve(new_layout)?;
        let count = old_layout.size().min(new_size);
        if count > 0 {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), count);
        }
        Ok(fresh)
    }

    /// Carve a backed child arena with its own budget out of this one.
    pub fn slice(&self, budget: usize) -> Result<Arena> {
        self.charge(budget)?;
        Ok(Arena::new(budget))
    }

    /// Reclaim every region at once.
    ///
    /// The backing chunk is kept for reuse. Taking `&mut self` guarantees no
    /// borrow of the arena survives; owners holding raw regions must drop
    /// them first.
    pub fn release(&mut self) {
        self.bump.reset();
        self.used.set(0);
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("budget", &self.budget)
            .field("used", &self.used.get())
            .field("allocated", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_within_budget() {
        let arena = Arena::new(256);
        let layout = Layout::from_size_align(64, 8).unwrap();
        let ptr = arena.reserve(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        assert_eq!(arena.used(), 64);
        assert_eq!(arena.remaining(), 192);
    }

    #[test]
    fn test_reserve_exhausted() {
        let arena = Arena::new(32);
        let layout = Layout::from_size_align(64, 8).unwrap();
        let err = arena.reserve(layout).unwrap_err();
        assert_eq!(
            err,
            EcsError::ArenaExhausted {
                requested: 64,
                remaining: 32
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_resize_copies_prefix() {
        let arena = Arena::new(1024);
        let layout = Layout::from_size_align(4, 4).unwrap();
        let ptr = arena.reserve(layout).unwrap();
        unsafe {
            std::ptr::write(ptr.as_ptr() as *mut u32, 0xDEAD_BEEF);
            let grown = arena.resize(ptr, layout, 16).unwrap();
            assert_eq!(std::ptr::read(grown.as_ptr() as *const u32), 0xDEAD_BEEF);
        }
        assert_eq!(arena.used(), 20);
    }

    #[test]
    fn test_slice_and_release() {
        let mut root = Arena::root(1000);
        assert_eq!(root.allocated_bytes(), 0);
        let child = root.slice(400).unwrap();
        assert!(child.allocated_bytes() >= 400);
        assert_eq!(child.budget(), 400);
        assert_eq!(root.remaining(), 600);
        assert!(root.slice(700).is_err());

        root.release();
        assert_eq!(root.used(), 0);
    }

    #[test]
    fn test_zero_sized_reserve_is_free() {
        let arena = Arena::new(0);
        let layout = Layout::from_size_align(0, 16).unwrap();
        let ptr = arena.reserve(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 16, 0);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_root_cannot_reserve() {
        let root = Arena::root(1024);
        let layout = Layout::from_size_align(64, 8).unwrap();
        assert!(root.reserve(layout).is_err());
        assert_eq!(root.used(), 0);
        assert_eq!(root.allocated_bytes(), 0);
    }

    #[test]
    fn test_backing_chunk_allocated_up_front() {
        let mut arena = Arena::new(1 << 16);
        let backing = arena.allocated_bytes();
        assert!(backing >= 1 << 16);

        let layout = Layout::from_size_align(1024, 16).unwrap();
        for _ in 0..32 {
            arena.reserve(layout).unwrap();
        }
        assert_eq!(arena.allocated_bytes(), backing);

        arena.release();
        assert_eq!(arena.allocated_bytes(), backing);
        assert_eq!(arena.used(), 0);
    }
}
