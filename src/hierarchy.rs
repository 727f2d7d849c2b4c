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

//! Parent/child links and world transform propagation
//!
//! The hierarchy is a forest: `set_parent` refuses any link that would close a
//! cycle. Mutating a local transform flags only that node as dirty; during
//! `update_hierarchy` a node is recomputed when it is dirty or when an
//! ancestor was recomputed on the same walk, so a dirty flag covers the whole
//! subtree below it.

use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use tracing::warn;

use crate::builtin::Transform;
use crate::directory::Directory;
use crate::entity::Entity;
use crate::error::{EcsError, Result};

impl Directory {
    /// True if `ancestor` appears on the parent chain of `entity`.
    pub fn is_descendant_of(&self, entity: Entity, ancestor: Entity) -> bool {
        if !self.is_valid(entity) || !self.is_valid(ancestor) {
            return false;
        }
        let mut current = self.records[entity.index()].parent;
        // A forest never has a chain longer than the slot count
        let mut steps = self.handles.slots();
        while self.is_valid(current) && steps > 0 {
            if current == ancestor {
                return true;
            }
            current = self.records[current.index()].parent;
            steps -= 1;
        }
        false
    }

    /// Re-link `entity` under `parent`, or make it a root when `parent` is
    /// `None`.
    ///
    /// Rejected, leaving the hierarchy untouched, when `parent` is `entity`
    /// itself or one of its descendants.
    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<()> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleEntity);
        }
        if let Some(parent) = parent {
            if !self.is_valid(parent) {
                return Err(EcsError::StaleEntity);
            }
            if parent == entity {
                return Err(EcsError::HierarchyError(format!(
                    "cannot parent {entity:?} to itself"
                )));
            }
            if self.is_descendant_of(parent, entity) {
                return Err(EcsError::HierarchyError(format!(
                    "{parent:?} is a descendant of {entity:?}"
                )));
            }
        }

        let old_parent = self.records[entity.index()].parent;
        if self.is_valid(old_parent) {
            self.records[old_parent.index()]
                .children
                .retain(|c| *c != entity);
        }

        let new_parent = parent.unwrap_or(Entity::NULL);
        if let Some(parent) = parent {
            self.records[parent.index()].children.push(entity);
        }
        let record = &mut self.records[entity.index()];
        record.parent = new_parent;
        record.dirty = true;
        Ok(())
    }

    /// Make `entity` a root.
    pub fn detach(&mut self, entity: Entity) -> Result<()> {
        self.set_parent(entity, None)
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.record(entity)?.parent()
    }

    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.record(entity)
            .map(|record| record.children())
            .unwrap_or(&[])
    }

    pub fn is_dirty(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|record| record.dirty)
    }

    pub fn mark_dirty(&mut self, entity: Entity) -> bool {
        match self.record_mut(entity) {
            Some(record) => {
                record.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Live entities without a parent
    pub fn roots(&self) -> Vec<Entity> {
        self.live_records()
            .filter(|record| record.parent().is_none())
            .map(|record| record.entity())
            .collect()
    }

    /// Cached world matrix; identity for entities without a transform
    pub fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        self.record(entity)?;
        Some(
            self.get::<Transform>(entity)
                .map(|transform| transform.world)
                .unwrap_or(Mat4::IDENTITY),
        )
    }

    /// World matrix `entity` inherits: that of its nearest ancestor carrying a
    /// [`Transform`], or identity. Transform-less ancestors pass their parent's
    /// matrix through, as they do during propagation.
    fn inherited_world(&self, entity: Entity) -> Mat4 {
        let mut current = self.records[entity.index()].parent;
        // Cycles are rejected by set_parent; the bound only guards the walk
        for _ in 0..self.records.len() {
            if !self.is_valid(current) {
                break;
            }
            if let Some(transform) = self.get::<Transform>(current) {
                return transform.world;
            }
            current = self.records[current.index()].parent;
        }
        Mat4::IDENTITY
    }

    /// Recompute world transforms of the subtree rooted at `root`.
    ///
    /// Returns the number of nodes recomputed. Every visited node leaves with
    /// its dirty flag cleared.
    pub fn update_hierarchy(&mut self, root: Entity) -> usize {
        if !self.is_valid(root) {
            warn!(entity = ?root, "update_hierarchy: entity not found");
            return 0;
        }

        let parent_world = self.inherited_world(root);

        let mut updated = 0;
        let mut stack: SmallVec<[(Entity, Mat4, bool); 16]> = SmallVec::new();
        stack.push((root, parent_world, false));

        while let Some((entity, parent_world, forced)) = stack.pop() {
            if !self.is_valid(entity) {
                continue;
            }
            let recompute = forced || self.records[entity.index()].dirty;
            let world = if recompute {
                updated += 1;
                self.records[entity.index()].dirty = false;
                match self.get_mut::<Transform>(entity) {
                    Some(transform) => {
                        transform.world = transform.compose(&parent_world);
                        transform.world
                    }
                    None => parent_world,
                }
            } else {
                self.get::<Transform>(entity)
                    .map(|transform| transform.world)
                    .unwrap_or(parent_world)
            };

            // Reverse so children are visited in insertion order
            stack.extend(
                self.records[entity.index()]
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (child, world, recompute)),
            );
        }
        updated
    }

    /// Update every tree in the forest.
    pub fn update_all_hierarchies(&mut self) -> usize {
        self.roots()
            .into_iter()
            .map(|root| self.update_hierarchy(root))
            .sum()
    }

    fn edit_transform(&mut self, entity: Entity, edit: impl FnOnce(&mut Transform)) -> bool {
        let Some(transform) = self.get_mut::<Transform>(entity) else {
            warn!(?entity, "transform not found");
            return false;
        };
        edit(transform);
        self.records[entity.index()].dirty = true;
        true
    }

    /// Move the local translation by `delta`.
    pub fn translate(&mut self, entity: Entity, delta: Vec3) -> bool {
        self.edit_transform(entity, |transform| transform.translation += delta)
    }

    /// Apply `rotation` after the current local rotation.
    pub fn rotate(&mut self, entity: Entity, rotation: Quat) -> bool {
        self.edit_transform(entity, |transform| {
            transform.rotation = (rotation * transform.rotation).normalize()
        })
    }

    /// Multiply the local scale component-wise by `factor`.
    pub fn scale(&mut self, entity: Entity, factor: Vec3) -> bool {
        self.edit_transform(entity, |transform| transform.scale *= factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::bitset::ArchetypeMask;
    use crate::component::ComponentKind;

    fn spawn(arena: &Arena, dir: &mut Directory) -> Entity {
        dir.new_entity(arena, ArchetypeMask::of(ComponentKind::Transform))
            .unwrap()
    }

    #[test]
    fn test_set_parent_links() {
        let arena = Arena::new(1 << 20);
        let mut dir = Directory::new(8);
        let parent = spawn(&arena, &mut dir);
        let child = spawn(&arena, &mut dir);

        dir.set_parent(child, Some(parent)).unwrap();
        assert_eq!(dir.parent_of(child), Some(parent));
        assert_eq!(dir.children_of(parent), &[child]);
        assert!(dir.is_dirty(child));

        dir.detach(child).unwrap();
        assert_eq!(dir.parent_of(child), None);
        assert!(dir.children_of(parent).is_empty());
    }

    #[test]
    fn test_self_parent_rejected() {
        let arena = Arena::new(1 << 20);
        let mut dir = Directory::new(8);
        let e = spawn(&arena, &mut dir);
        assert!(matches!(
            dir.set_parent(e, Some(e)),
            Err(EcsError::HierarchyError(_))
        ));
        assert_eq!(dir.parent_of(e), None);
    }

    #[test]
    fn test_translate_requires_transform() {
        let arena = Arena::new(1 << 20);
        let mut dir = Directory::new(8);
        let bare = dir.new_entity(&arena, ArchetypeMask::EMPTY).unwrap();
        assert!(!dir.translate(bare, Vec3::X));
        assert!(!dir.is_dirty(bare));
    }

    #[test]
    fn test_clean_subtree_skipped() {
        let arena = Arena::new(1 << 20);
        let mut dir = Directory::new(8);
        let root = spawn(&arena, &mut dir);
        let a = spawn(&arena, &mut dir);
        let b = spawn(&arena, &mut dir);
        dir.set_parent(a, Some(root)).unwrap();
        dir.set_parent(b, Some(root)).unwrap();
        assert_eq!(dir.update_hierarchy(root), 2);

        dir.translate(b, Vec3::Y);
        assert_eq!(dir.update_hierarchy(root), 1);
        assert_eq!(dir.update_hierarchy(root), 0);
    }
}
