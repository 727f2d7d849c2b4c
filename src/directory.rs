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

//! Entity directory: handle -> (archetype, pool, row, hierarchy links)
//!
//! The directory owns the component pool set and is the only code allowed to
//! change pool row occupancy. Every swap-remove goes through
//! [`Directory::remove_row`], which patches the record of the entity whose row
//! was moved, so records and storage never disagree.

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::archetype::{ComponentPool, PoolId};
use crate::arena::Arena;
use crate::bitset::ArchetypeMask;
use crate::builtin::Transform;
use crate::component::Component;
use crate::entity::{Entity, HandlePool};
use crate::error::{EcsError, Result};

/// Child list; most nodes have only a few children
pub type ChildList = SmallVec<[Entity; 4]>;

/// Per-slot entity metadata
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub(crate) entity: Entity,
    /// `Entity::NULL` for roots
    pub(crate) parent: Entity,
    pub(crate) children: ChildList,
    /// Cached world transform of this subtree is stale
    pub(crate) dirty: bool,
    pub(crate) archetype: ArchetypeMask,
    pub(crate) pool: PoolId,
    pub(crate) row: usize,
}

impl EntityRecord {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn parent(&self) -> Option<Entity> {
        (!self.parent.is_null()).then_some(self.parent)
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn archetype(&self) -> ArchetypeMask {
        self.archetype
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn row(&self) -> usize {
        self.row
    }
}

/// Indirect access table for one scene
#[derive(Debug)]
pub struct Directory {
    pub(crate) handles: HandlePool,
    pub(crate) records: Vec<EntityRecord>,
    pub(crate) pools: Vec<ComponentPool>,
    pool_index: AHashMap<ArchetypeMask, PoolId>,
    initial_rows: usize,
}

impl Directory {
    pub fn new(initial_rows: usize) -> Self {
        Self {
            handles: HandlePool::new(),
            records: Vec::new(),
            pools: Vec::new(),
            pool_index: AHashMap::with_capacity(16),
            initial_rows,
        }
    }

    pub fn is_valid(&self, entity: Entity) -> bool {
        self.handles.is_valid(entity)
    }

    /// Record of a live entity
    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        if !self.is_valid(entity) {
            return None;
        }
        self.records.get(entity.index())
    }

    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        if !self.is_valid(entity) {
            return None;
        }
        self.records.get_mut(entity.index())
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.handles.live()
    }

    pub fn pools(&self) -> &[ComponentPool] {
        &self.pools
    }

    pub fn pool(&self, id: PoolId) -> Option<&ComponentPool> {
        self.pools.get(id)
    }

    /// Pool for exactly `mask`, if one was ever created
    pub fn pool_for(&self, mask: ArchetypeMask) -> Option<PoolId> {
        self.pool_index.get(&mask).copied()
    }

    /// Find the pool for `mask` or append a new one.
    pub fn get_or_create_pool(&mut self, arena: &Arena, mask: ArchetypeMask) -> Result<PoolId> {
        if let Some(&id) = self.pool_index.get(&mask) {
            return Ok(id);
        }
        let pool = ComponentPool::new(mask, arena, self.initial_rows)?;
        let id = self.pools.len();
        self.pools.push(pool);
        self.pool_index.insert(mask, id);
        debug!(pool = id, archetype = ?mask, "created component pool");
        Ok(id)
    }

    /// Create an entity whose components are default-initialized.
    pub fn new_entity(&mut self, arena: &Arena, mask: ArchetypeMask) -> Result<Entity> {
        // Storage first, so a failed reservation leaves no half-made entity
        let pool = self.get_or_create_pool(arena, mask)?;
        let entity = self.handles.acquire();
        let row = match self.pools[pool].push_default(arena, entity) {
            Ok(row) => row,
            Err(err) => {
                self.handles.release(entity);
                return Err(err);
            }
        };

        let record = EntityRecord {
            entity,
            parent: Entity::NULL,
            children: ChildList::new(),
            dirty: false,
            archetype: mask,
            pool,
            row,
        };
        match self.records.get_mut(entity.index()) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
        Ok(entity)
    }

    /// Destroy an entity.
    ///
    /// Its children are promoted to its parent (or become roots) and marked
    /// dirty. Returns `false` with a warning if the handle is stale.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let Some(record) = self.record(entity) else {
            warn!(?entity, "remove_entity: entity not found");
            return false;
        };
        let parent = record.parent;
        let children = record.children.clone();
        let (pool, row) = (record.pool, record.row);

        if self.is_valid(parent) {
            self.records[parent.index()].children.retain(|c| *c != entity);
        }
        for child in children {
            let child_record = &mut self.records[child.index()];
            child_record.parent = parent;
            child_record.dirty = true;
            if self.is_valid(parent) {
                self.records[parent.index()].children.push(child);
            }
        }

        self.remove_row(pool, row);
        let record = &mut self.records[entity.index()];
        record.parent = Entity::NULL;
        record.children.clear();
        self.handles.release(entity);
        true
    }

    /// Swap-remove `row` from `pool` and repoint the moved entity's record.
    fn remove_row(&mut self, pool: PoolId, row: usize) {
        if let Some(moved) = self.pools[pool].swap_remove(row) {
            self.records[moved.index()].row = row;
        }
    }

    /// Move `entity` into the pool for `new_mask`, carrying over shared kinds.
    ///
    /// The destination row is secured before anything is touched, so an arena
    /// failure leaves the entity where it was.
    fn migrate(&mut self, arena: &Arena, entity: Entity, new_mask: ArchetypeMask) -> Result<()> {
        let (old_pool, old_row) = {
            let record = self.record(entity).ok_or(EcsError::StaleEntity)?;
            (record.pool, record.row)
        };
        let new_pool = self.get_or_create_pool(arena, new_mask)?;
        debug_assert_ne!(old_pool, new_pool);
        let new_row = self.pools[new_pool].push_default(arena, entity)?;

        let (src, dst) = if old_pool < new_pool {
            let (left, right) = self.pools.split_at_mut(new_pool);
            (&left[old_pool], &mut right[0])
        } else {
            let (left, right) = self.pools.split_at_mut(old_pool);
            (&right[0], &mut left[new_pool])
        };
        src.copy_shared_into(old_row, dst, new_row);

        self.remove_row(old_pool, old_row);

        let record = &mut self.records[entity.index()];
        record.archetype = new_mask;
        record.pool = new_pool;
        record.row = new_row;
        Ok(())
    }

    /// Attach `value` to `entity`, migrating it to the wider archetype.
    ///
    /// If the entity already carries `T` the value is overwritten in place.
    /// Writing a [`Transform`] marks the entity dirty.
    pub fn add_component<T: Component>(
        &mut self,
        arena: &Arena,
        entity: Entity,
        value: T,
    ) -> Result<()> {
        let mask = self.record(entity).ok_or(EcsError::StaleEntity)?.archetype;
        if !mask.contains(T::KIND) {
            self.migrate(arena, entity, mask.with(T::KIND))?;
        }
        if let Some(slot) = self.get_mut::<T>(entity) {
            *slot = value;
        }
        if T::KIND == Transform::KIND {
            self.records[entity.index()].dirty = true;
        }
        Ok(())
    }

    /// Drop `T` from `entity`, migrating it to the narrower archetype.
    pub fn remove_component<T: Component>(&mut self, arena: &Arena, entity: Entity) -> Result<()> {
        let mask = self.record(entity).ok_or(EcsError::StaleEntity)?.archetype;
        if !mask.contains(T::KIND) {
            return Err(EcsError::ComponentNotFound);
        }
        self.migrate(arena, entity, mask.without(T::KIND))
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let record = self.record(entity)?;
        self.pools[record.pool].get::<T>(record.row)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let (pool, row) = {
            let record = self.record(entity)?;
            (record.pool, record.row)
        };
        self.pools[pool].get_mut::<T>(row)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.record(entity)
            .is_some_and(|record| record.archetype.contains(T::KIND))
    }

    /// Live entities whose archetype contains every kind of `constraint`,
    /// in pool-creation order then row order.
    pub fn matching(&self, constraint: ArchetypeMask) -> impl Iterator<Item = Entity> + '_ {
        self.pools
            .iter()
            .filter(move |pool| pool.mask().is_superset_of(constraint))
            .flat_map(|pool| pool.entities().iter().copied())
    }

    /// Every live entity record
    pub fn live_records(&self) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.records
            .iter()
            .filter(move |record| self.handles.is_valid(record.entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Camera, Mesh};
    use crate::component::ComponentKind;
    use glam::Vec3;

    fn setup() -> (Arena, Directory) {
        (Arena::new(1 << 20), Directory::new(4))
    }

    fn t() -> ArchetypeMask {
        ArchetypeMask::of(ComponentKind::Transform)
    }

    /// Every record points at the row that actually stores its entity
    fn assert_rows_consistent(dir: &Directory) {
        for record in dir.live_records() {
            let pool = &dir.pools[record.pool];
            assert_eq!(pool.mask(), record.archetype);
            assert_eq!(pool.entity(record.row), Some(record.entity));
        }
    }

    #[test]
    fn test_new_entity_record() {
        let (arena, mut dir) = setup();
        let e = dir.new_entity(&arena, t()).unwrap();
        let record = dir.record(e).unwrap();
        assert_eq!(record.archetype(), t());
        assert_eq!(record.row(), 0);
        assert!(record.parent().is_none());
        assert!(!record.is_dirty());
        assert_eq!(dir.entity_count(), 1);
    }

    #[test]
    fn test_remove_fixes_swapped_row() {
        let (arena, mut dir) = setup();
        let a = dir.new_entity(&arena, t()).unwrap();
        let b = dir.new_entity(&arena, t()).unwrap();
        let c = dir.new_entity(&arena, t()).unwrap();
        dir.get_mut::<Transform>(c).unwrap().translation = Vec3::X;

        assert!(dir.remove_entity(a));
        assert_eq!(dir.record(c).unwrap().row(), 0);
        assert_eq!(dir.get::<Transform>(c).unwrap().translation, Vec3::X);
        assert_eq!(dir.record(b).unwrap().row(), 1);
        assert_rows_consistent(&dir);
    }

    #[test]
    fn test_remove_stale_is_noop() {
        let (arena, mut dir) = setup();
        let e = dir.new_entity(&arena, t()).unwrap();
        assert!(dir.remove_entity(e));
        assert!(!dir.remove_entity(e));
        assert_eq!(dir.entity_count(), 0);
    }

    #[test]
    fn test_add_component_migrates() {
        let (arena, mut dir) = setup();
        let e = dir.new_entity(&arena, t()).unwrap();
        let other = dir.new_entity(&arena, t()).unwrap();
        dir.get_mut::<Transform>(e).unwrap().translation = Vec3::new(1.0, 2.0, 3.0);

        dir.add_component(&arena, e, Camera::default()).unwrap();

        let record = dir.record(e).unwrap();
        assert!(record.archetype().contains(ComponentKind::Camera));
        assert_eq!(
            dir.get::<Transform>(e).unwrap().translation,
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(dir.pools[dir.pool_for(t()).unwrap()].len(), 1);
        assert_eq!(dir.record(other).unwrap().row(), 0);
        assert_rows_consistent(&dir);
    }

    #[test]
    fn test_add_existing_component_overwrites() {
        let (arena, mut dir) = setup();
        let e = dir.new_entity(&arena, t().with(ComponentKind::Mesh)).unwrap();
        let pools_before = dir.pools().len();
        let mesh = Mesh {
            resource: None,
            visible: false,
        };
        dir.add_component(&arena, e, mesh).unwrap();
        assert_eq!(dir.pools().len(), pools_before);
        assert!(!dir.get::<Mesh>(e).unwrap().visible);
    }

    #[test]
    fn test_remove_component() {
        let (arena, mut dir) = setup();
        let e = dir.new_entity(&arena, t().with(ComponentKind::Mesh)).unwrap();
        dir.remove_component::<Mesh>(&arena, e).unwrap();
        assert!(!dir.has::<Mesh>(e));
        assert!(dir.has::<Transform>(e));
        assert_eq!(
            dir.remove_component::<Mesh>(&arena, e),
            Err(EcsError::ComponentNotFound)
        );
        assert_rows_consistent(&dir);
    }

    #[test]
    fn test_failed_migration_leaves_entity_in_place() {
        let arena = Arena::new(2048);
        let mut dir = Directory::new(1);
        let e = dir.new_entity(&arena, t()).unwrap();
        // Drain the budget so the destination pool cannot be created
        while arena
            .reserve(std::alloc::Layout::from_size_align(64, 8).unwrap())
            .is_ok()
        {}

        let err = dir.add_component(&arena, e, Camera::default()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(dir.record(e).unwrap().archetype(), t());
        assert_rows_consistent(&dir);
    }
}
