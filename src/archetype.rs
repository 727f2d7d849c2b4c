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

//! Component pools: arena-backed Structure of Arrays storage
//!
//! One pool exists per archetype mask. Every column (one per kind in the mask,
//! plus the owning-entity column) holds `len` rows in lock-step: row `i` of
//! every column belongs to the same entity.
//!
//! Row occupancy is only changed by the entity directory, which keeps its
//! records in sync with every swap-remove.

use std::alloc::Layout;
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::bitset::ArchetypeMask;
use crate::component::{Component, ComponentKind};
use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Index of a pool within its scene; stable for the scene's lifetime
pub type PoolId = usize;

/// Type-erased column living in arena memory
struct RawColumn {
    item: Layout,
    ptr: NonNull<u8>,
}

impl RawColumn {
    fn reserve(arena: &Arena, item: Layout, rows: usize) -> Result<Self> {
        let ptr = arena.reserve(Self::block(item, rows)?)?;
        Ok(Self { item, ptr })
    }

    fn block(item: Layout, rows: usize) -> Result<Layout> {
        let size = item
            .size()
            .checked_mul(rows)
            .ok_or(EcsError::ArenaExhausted {
                requested: usize::MAX,
                remaining: 0,
            })?;
        Layout::from_size_align(size, item.align()).map_err(|_| EcsError::ArenaExhausted {
            requested: size,
            remaining: 0,
        })
    }

    fn grow(&mut self, arena: &Arena, old_rows: usize, new_rows: usize) -> Result<()> {
        let old = Self::block(self.item, old_rows)?;
        let new = Self::block(self.item, new_rows)?;
        self.ptr = unsafe { arena.resize(self.ptr, old, new.size())? };
        Ok(())
    }

    /// Pointer to `row`; caller keeps `row` within capacity.
    fn at(&self, row: usize) -> *mut u8 {
        unsafe { self.ptr.as_ptr().add(row * self.item.size()) }
    }

    /// Move the bytes of row `src` over row `dst`
    unsafe fn overwrite(&self, src: usize, dst: usize) {
        std::ptr::copy_nonoverlapping(self.at(src), self.at(dst), self.item.size());
    }
}

/// Dense storage for every entity sharing one archetype
pub struct ComponentPool {
    mask: ArchetypeMask,
    entities: RawColumn,
    columns: SmallVec<[(ComponentKind, RawColumn); 4]>,
    len: usize,
    capacity: usize,
}

impl ComponentPool {
    /// Create a pool for `mask` with room for `initial_rows` rows.
    pub(crate) fn new(mask: ArchetypeMask, arena: &Arena, initial_rows: usize) -> Result<Self> {
        let capacity = initial_rows.max(1);
        let entities = RawColumn::reserve(arena, Layout::new::<Entity>(), capacity)?;
        let mut columns = SmallVec::new();
        for kind in mask.kinds() {
            columns.push((kind, RawColumn::reserve(arena, kind.layout(), capacity)?));
        }
        Ok(Self {
            mask,
            entities,
            columns,
            len: 0,
            capacity,
        })
    }

    /// Archetype this pool stores
    pub fn mask(&self) -> ArchetypeMask {
        self.mask
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owning entity of every row, in row order
    pub fn entities(&self) -> &[Entity] {
        unsafe { std::slice::from_raw_parts(self.entities.ptr.as_ptr() as *const Entity, self.len) }
    }

    pub fn entity(&self, row: usize) -> Option<Entity> {
        self.entities().get(row).copied()
    }

    fn column(&self, kind: ComponentKind) -> Option<&RawColumn> {
        let idx = self.mask.rank(kind)?;
        self.columns.get(idx).map(|(_, column)| column)
    }

    fn ensure_capacity(&mut self, arena: &Arena) -> Result<()> {
        if self.len < self.capacity {
            return Ok(());
        }
        let new_capacity = self.capacity * 2;
        self.entities.grow(arena, self.capacity, new_capacity)?;
        for (_, column) in &mut self.columns {
            column.grow(arena, self.capacity, new_capacity)?;
        }
        self.capacity = new_capacity;
        Ok(())
    }

    /// Append a row owned by `entity` with every component default-initialized.
    pub(crate) fn push_default(&mut self, arena: &Arena, entity: Entity) -> Result<usize> {
        self.ensure_capacity(arena)?;
        let row = self.len;
        unsafe {
            std::ptr::write(self.entities.at(row) as *mut Entity, entity);
            for (kind, column) in &self.columns {
                kind.write_default(column.at(row));
            }
        }
        self.len += 1;
        Ok(row)
    }

    /// Remove `row` by moving the last row into it.
    ///
    /// Returns the entity that now occupies `row`, if any row was moved.
    pub(crate) fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        if row >= self.len {
            return None;
        }
        let last = self.len - 1;
        if row < last {
            unsafe {
                self.entities.overwrite(last, row);
                for (_, column) in &self.columns {
                    column.overwrite(last, row);
                }
            }
        }
        self.len = last;
        if row < self.len {
            self.entity(row)
        } else {
            None
        }
    }

    /// Copy every kind shared by both pools from `src_row` of `self` into
    /// `dst_row` of `dst`.
    pub(crate) fn copy_shared_into(&self, src_row: usize, dst: &mut ComponentPool, dst_row: usize) {
        debug_assert!(src_row < self.len && dst_row < dst.len);
        for (kind, column) in &self.columns {
            if let Some(target) = dst.column(*kind) {
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        column.at(src_row),
                        target.at(dst_row),
                        column.item.size(),
                    );
                }
            }
        }
    }

    /// Raw pointer to the `T` in `row`, or `None` if absent.
    pub(crate) fn component_ptr<T: Component>(&self, row: usize) -> Option<*mut T> {
        debug_assert_eq!(Layout::new::<T>(), T::KIND.layout());
        if row >= self.len {
            return None;
        }
        self.column(T::KIND).map(|column| column.at(row) as *mut T)
    }

    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        self.component_ptr::<T>(row).map(|ptr| unsafe { &*ptr })
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        self.component_ptr::<T>(row).map(|ptr| unsafe { &mut *ptr })
    }

    /// Whole column of `T`, in row order
    pub fn column_slice<T: Component>(&self) -> Option<&[T]> {
        debug_assert_eq!(Layout::new::<T>(), T::KIND.layout());
        let column = self.column(T::KIND)?;
        Some(unsafe { std::slice::from_raw_parts(column.ptr.as_ptr() as *const T, self.len) })
    }

    pub fn column_slice_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        debug_assert_eq!(Layout::new::<T>(), T::KIND.layout());
        let column = self.column(T::KIND)?;
        Some(unsafe { std::slice::from_raw_parts_mut(column.ptr.as_ptr() as *mut T, self.len) })
    }
}

impl std::fmt::Debug for ComponentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentPool")
            .field("mask", &self.mask)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Mesh, Transform};
    use glam::Vec3;

    fn transform_mesh() -> ArchetypeMask {
        ArchetypeMask::from_kinds(&[ComponentKind::Transform, ComponentKind::Mesh])
    }

    #[test]
    fn test_pool_creation() {
        let arena = Arena::new(1 << 16);
        let pool = ComponentPool::new(transform_mesh(), &arena, 4).unwrap();
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.capacity(), 4);
        assert!(arena.used() > 0);
    }

    #[test]
    fn test_push_defaults_and_grow() {
        let arena = Arena::new(1 << 16);
        let mut pool = ComponentPool::new(transform_mesh(), &arena, 1).unwrap();
        for slot in 0..5 {
            let row = pool.push_default(&arena, Entity::new(slot, 0)).unwrap();
            assert_eq!(row, slot as usize);
        }
        assert_eq!(pool.len(), 5);
        assert!(pool.capacity() >= 5);
        assert_eq!(pool.get::<Transform>(3), Some(&Transform::default()));
        assert!(pool.get::<Mesh>(4).unwrap().visible);
        assert_eq!(pool.entity(2), Some(Entity::new(2, 0)));
    }

    #[test]
    fn test_swap_remove_moves_last_row() {
        let arena = Arena::new(1 << 16);
        let mut pool = ComponentPool::new(transform_mesh(), &arena, 4).unwrap();
        for slot in 0..3 {
            let row = pool.push_default(&arena, Entity::new(slot, 0)).unwrap();
            pool.get_mut::<Transform>(row).unwrap().translation = Vec3::splat(slot as f32);
        }

        let moved = pool.swap_remove(0);
        assert_eq!(moved, Some(Entity::new(2, 0)));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get::<Transform>(0).unwrap().translation, Vec3::splat(2.0));

        // Removing the last row moves nothing
        assert_eq!(pool.swap_remove(1), None);
        assert_eq!(pool.entities(), &[Entity::new(2, 0)]);
    }

    #[test]
    fn test_exhausted_arena() {
        let arena = Arena::new(16);
        let err = ComponentPool::new(transform_mesh(), &arena, 64).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_kind_is_none() {
        let arena = Arena::new(1 << 16);
        let mut pool =
            ComponentPool::new(ArchetypeMask::of(ComponentKind::Transform), &arena, 2).unwrap();
        pool.push_default(&arena, Entity::new(0, 0)).unwrap();
        assert!(pool.get::<Mesh>(0).is_none());
        assert!(pool.get::<Transform>(1).is_none());
        assert!(pool.column_slice::<Mesh>().is_none());
    }
}
