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

//! Query cursor with archetype filtering
//!
//! A [`Query`] walks every pool whose archetype is a superset of the
//! constraint, in pool-creation order, and inside each pool row by row:
//!
//! ```ignore
//! let mut query = scene.query(ArchetypeMask::of(ComponentKind::Transform));
//! while query.next() {
//!     let transform = query.get_mut::<Transform>().unwrap();
//!     transform.translation.y += 1.0;
//! }
//! ```
//!
//! The cursor borrows the directory mutably, so no entity can be created,
//! removed or migrated while it is alive.

use smallvec::SmallVec;

use crate::archetype::PoolId;
use crate::bitset::ArchetypeMask;
use crate::component::Component;
use crate::directory::Directory;
use crate::entity::Entity;

/// Cursor over every row matching an archetype constraint
pub struct Query<'d> {
    directory: &'d mut Directory,
    constraint: ArchetypeMask,
    matched: SmallVec<[PoolId; 8]>,
    pool_pos: usize,
    next_row: usize,
    current: Option<(PoolId, usize)>,
}

impl<'d> Query<'d> {
    /// Begin iteration over pools whose mask contains `constraint`.
    pub fn begin(directory: &'d mut Directory, constraint: ArchetypeMask) -> Self {
        let matched = directory
            .pools()
            .iter()
            .enumerate()
            .filter(|(_, pool)| pool.mask().is_superset_of(constraint))
            .map(|(id, _)| id)
            .collect();
        Self {
            directory,
            constraint,
            matched,
            pool_pos: 0,
            next_row: 0,
            current: None,
        }
    }

    pub fn constraint(&self) -> ArchetypeMask {
        self.constraint
    }

    /// Pools selected by the constraint, in creation order
    pub fn matched_pools(&self) -> &[PoolId] {
        &self.matched
    }

    /// Advance to the next matching row. Returns `false` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        while let Some(&id) = self.matched.get(self.pool_pos) {
            if self.next_row < self.directory.pools[id].len() {
                self.current = Some((id, self.next_row));
                self.next_row += 1;
                return true;
            }
            self.pool_pos += 1;
            self.next_row = 0;
        }
        self.current = None;
        false
    }

    /// Entity owning the current row, or `Entity::NULL` outside a row
    pub fn entity(&self) -> Entity {
        self.current
            .and_then(|(id, row)| self.directory.pools[id].entity(row))
            .unwrap_or(Entity::NULL)
    }

    /// Archetype of the current row's pool
    pub fn archetype(&self) -> Option<ArchetypeMask> {
        self.current.map(|(id, _)| self.directory.pools[id].mask())
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        let (id, row) = self.current?;
        self.directory.pools[id].get::<T>(row)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let (id, row) = self.current?;
        self.directory.pools[id].get_mut::<T>(row)
    }

    /// Two distinct components of the current row at once.
    ///
    /// Returns `None` if `A` and `B` are the same kind or either is absent.
    pub fn get_pair_mut<A: Component, B: Component>(&mut self) -> Option<(&mut A, &mut B)> {
        if A::KIND == B::KIND {
            return None;
        }
        let (id, row) = self.current?;
        let pool = &self.directory.pools[id];
        let a = pool.component_ptr::<A>(row)?;
        let b = pool.component_ptr::<B>(row)?;
        // Different kinds live in different columns, so the borrows are disjoint
        unsafe { Some((&mut *a, &mut *b)) }
    }

    /// Flag the current entity's cached world transform as stale.
    pub fn mark_dirty(&mut self) {
        let entity = self.entity();
        self.directory.mark_dirty(entity);
    }

    /// Read access to the rest of the scene while iterating
    pub fn directory(&self) -> &Directory {
        self.directory
    }
}
