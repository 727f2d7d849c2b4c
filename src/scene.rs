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

//! Scene: one isolated world of entities, pools and systems
//!
//! A scene owns its arena region. Component storage is carved out of that
//! region and reclaimed all at once when the scene is torn down.
//!
//! Stale handles passed to read or mutate operations are absorbed: the call
//! logs a warning and returns `None`, `false` or [`EcsError::StaleEntity`]
//! without touching any state.

use std::any::Any;

use glam::{Quat, Vec3};
use tracing::{debug, warn};

use crate::archetype::{ComponentPool, PoolId};
use crate::arena::Arena;
use crate::bitset::ArchetypeMask;
use crate::builtin::{Armature, AudioSource, Camera, Clip, Material, Mesh, Transform};
use crate::component::{Component, ComponentKind};
use crate::directory::Directory;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::frame::FrameContext;
use crate::query::Query;
use crate::resource::{ResourceHandle, ResourceKind, ResourceLookup};
use crate::system::{BoxedSystem, ContextSystem, FnSystem, FrameReport, SystemRegistry};

/// Default gravity, metres per second squared
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Central per-scene container
pub struct Scene {
    name: String,
    arena: Arena,
    directory: Directory,
    systems: SystemRegistry,
    /// Names of the systems taken out of `systems` for the running frame
    running: Vec<String>,
    main_camera: Entity,
    gravity: Vec3,
    user_data: Option<Box<dyn Any>>,
}

impl Scene {
    /// Create an empty scene living in `arena`.
    pub fn new(name: impl Into<String>, arena: Arena, initial_pool_rows: usize) -> Self {
        Self {
            name: name.into(),
            arena,
            directory: Directory::new(initial_pool_rows),
            systems: SystemRegistry::new(),
            running: Vec::new(),
            main_camera: Entity::NULL,
            gravity: DEFAULT_GRAVITY,
            user_data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arena region backing this scene's component storage
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Tear the scene down, handing its arena back for reuse.
    pub fn into_arena(self) -> Arena {
        self.arena
    }

    // Singletons

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Main camera entity, if one is set, still alive and still carrying a
    /// [`Camera`]
    pub fn main_camera(&self) -> Option<Entity> {
        self.directory
            .has::<Camera>(self.main_camera)
            .then_some(self.main_camera)
    }

    /// Designate the main camera. The entity must carry a [`Camera`].
    pub fn set_main_camera(&mut self, entity: Entity) -> Result<()> {
        if !self.directory.is_valid(entity) {
            warn!(?entity, "set_main_camera: entity not found");
            return Err(EcsError::StaleEntity);
        }
        if !self.directory.has::<Camera>(entity) {
            warn!(?entity, "set_main_camera: entity has no camera");
            return Err(EcsError::ComponentNotFound);
        }
        self.main_camera = entity;
        Ok(())
    }

    /// Camera and transform of the main camera, for the renderer
    pub fn main_camera_data(&self) -> Option<(Camera, Transform)> {
        let entity = self.main_camera()?;
        let camera = *self.directory.get::<Camera>(entity)?;
        let transform = self
            .directory
            .get::<Transform>(entity)
            .copied()
            .unwrap_or_default();
        Some((camera, transform))
    }

    /// Attach per-scene user data. Only the first call succeeds.
    pub fn set_user_data<T: Any>(&mut self, value: T) -> Result<()> {
        if self.user_data.is_some() {
            return Err(EcsError::UserDataAlreadySet);
        }
        self.user_data = Some(Box::new(value));
        Ok(())
    }

    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_ref()?.downcast_ref::<T>()
    }

    pub fn user_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut()?.downcast_mut::<T>()
    }

    // Entities and components

    pub fn new_entity(&mut self, archetype: ArchetypeMask) -> Result<Entity> {
        self.directory.new_entity(&self.arena, archetype)
    }

    /// Destroy an entity; its children move up to its parent.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let removed = self.directory.remove_entity(entity);
        if removed && entity == self.main_camera {
            self.main_camera = Entity::NULL;
        }
        removed
    }

    pub fn is_valid(&self, entity: Entity) -> bool {
        self.directory.is_valid(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.directory.entity_count()
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        let result = self.directory.add_component(&self.arena, entity, value);
        if let Err(EcsError::StaleEntity) = result {
            warn!(?entity, component = T::KIND.name(), "add_component: entity not found");
        }
        result
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        let result = self.directory.remove_component::<T>(&self.arena, entity);
        if let Err(EcsError::StaleEntity) = result {
            warn!(?entity, component = T::KIND.name(), "remove_component: entity not found");
        }
        result
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.directory.get::<T>(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.directory.get_mut::<T>(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.directory.has::<T>(entity)
    }

    /// Replace the local transform and flag the entity dirty.
    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        match self.directory.get_mut::<Transform>(entity) {
            Some(slot) => {
                *slot = transform;
                self.directory.mark_dirty(entity)
            }
            None => {
                warn!(?entity, "set_transform: transform not found");
                false
            }
        }
    }

    pub fn archetype_of(&self, entity: Entity) -> Option<ArchetypeMask> {
        self.directory.record(entity).map(|record| record.archetype())
    }

    /// Pool and row currently storing `entity`
    pub fn location_of(&self, entity: Entity) -> Option<(PoolId, usize)> {
        self.directory
            .record(entity)
            .map(|record| (record.pool(), record.row()))
    }

    pub fn pools(&self) -> &[ComponentPool] {
        self.directory.pools()
    }

    pub fn pool_count(&self) -> usize {
        self.directory.pools().len()
    }

    /// Row count of the pool for exactly `mask` (0 if it was never created)
    pub fn pool_len(&self, mask: ArchetypeMask) -> usize {
        self.directory
            .pool_for(mask)
            .and_then(|id| self.directory.pool(id))
            .map_or(0, |pool| pool.len())
    }

    // Hierarchy

    /// Re-link `entity` under `parent` (or make it a root with `None`).
    ///
    /// Cycles and self-parenting are rejected with a warning and leave the
    /// hierarchy unchanged.
    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<()> {
        let result = self.directory.set_parent(entity, parent);
        if let Err(err) = &result {
            warn!(?entity, ?parent, %err, "set_parent rejected");
        }
        result
    }

    pub fn detach(&mut self, entity: Entity) -> Result<()> {
        self.set_parent(entity, None)
    }

    pub fn is_descendant_of(&self, entity: Entity, ancestor: Entity) -> bool {
        self.directory.is_descendant_of(entity, ancestor)
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.directory.parent_of(entity)
    }

    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.directory.children_of(entity)
    }

    pub fn is_dirty(&self, entity: Entity) -> bool {
        self.directory.is_dirty(entity)
    }

    pub fn translate(&mut self, entity: Entity, delta: Vec3) -> bool {
        self.directory.translate(entity, delta)
    }

    pub fn rotate(&mut self, entity: Entity, rotation: Quat) -> bool {
        self.directory.rotate(entity, rotation)
    }

    pub fn scale(&mut self, entity: Entity, factor: Vec3) -> bool {
        self.directory.scale(entity, factor)
    }

    pub fn update_hierarchy(&mut self, root: Entity) -> usize {
        self.directory.update_hierarchy(root)
    }

    pub fn update_all_hierarchies(&mut self) -> usize {
        self.directory.update_all_hierarchies()
    }

    /// Cached world-space position
    pub fn world_position(&self, entity: Entity) -> Option<Vec3> {
        self.directory
            .world_matrix(entity)
            .map(|world| world.w_axis.truncate())
    }

    // Iteration

    /// Begin a cursor over every entity whose archetype contains `constraint`.
    pub fn query(&mut self, constraint: ArchetypeMask) -> Query<'_> {
        Query::begin(&mut self.directory, constraint)
    }

    /// Entities matching `constraint`, in iteration order
    pub fn matching(&self, constraint: ArchetypeMask) -> impl Iterator<Item = Entity> + '_ {
        self.directory.matching(constraint)
    }

    // Systems

    pub fn register_system(&mut self, system: BoxedSystem) {
        self.systems.register(system);
    }

    /// Register a closure system.
    pub fn add_system<F>(&mut self, name: &str, func: F)
    where
        F: FnMut(&mut Scene, &FrameContext<'_>) -> bool + 'static,
    {
        self.register_system(Box::new(FnSystem::new(name, func)));
    }

    /// Register a system that owns a typed context value.
    pub fn add_system_with<C, F>(&mut self, name: &str, context: C, func: F)
    where
        C: 'static,
        F: FnMut(&mut C, &mut Scene, &FrameContext<'_>) -> bool + 'static,
    {
        self.register_system(Box::new(ContextSystem::new(name, context, func)));
    }

    /// Registered systems, including those of a frame in progress
    pub fn system_count(&self) -> usize {
        self.running.len() + self.systems.len()
    }

    /// Names in registration order, including those of a frame in progress
    pub fn system_names(&self) -> Vec<String> {
        self.running
            .iter()
            .cloned()
            .chain(self.systems.names().map(str::to_string))
            .collect()
    }

    /// Run every registered system once, in registration order.
    ///
    /// Systems registered while the frame runs are kept and first run on the
    /// next frame.
    pub fn run_systems(&mut self, frame: &FrameContext<'_>) -> FrameReport {
        let mut systems = std::mem::take(&mut self.systems);
        self.running = systems.names().map(str::to_string).collect();
        let report = systems.run(self, frame);
        self.running.clear();
        systems.append(&mut self.systems);
        self.systems = systems;
        report
    }

    // Resources

    /// Resolve `label` and store the handle on the matching component of
    /// `entity`. Unknown labels and missing components are logged and skipped.
    pub fn bind_resource(
        &mut self,
        entity: Entity,
        kind: ResourceKind,
        label: &str,
        lookup: &dyn ResourceLookup,
    ) -> bool {
        let Some(handle) = lookup.lookup(kind, label) else {
            warn!(?kind, label, "resource not found");
            return false;
        };
        let slot = match kind {
            ResourceKind::Mesh => self.directory.get_mut::<Mesh>(entity).map(|c| &mut c.resource),
            ResourceKind::Material => self
                .directory
                .get_mut::<Material>(entity)
                .map(|c| &mut c.resource),
            ResourceKind::Texture => self
                .directory
                .get_mut::<Material>(entity)
                .map(|c| &mut c.texture),
            ResourceKind::Clip => self.directory.get_mut::<Clip>(entity).map(|c| &mut c.clip),
            ResourceKind::Skeleton => self
                .directory
                .get_mut::<Armature>(entity)
                .map(|c| &mut c.skeleton),
            ResourceKind::Sound => self
                .directory
                .get_mut::<AudioSource>(entity)
                .map(|c| &mut c.sound),
        };
        match slot {
            Some(slot) => {
                *slot = Some(handle);
                true
            }
            None => {
                warn!(?entity, ?kind, label, "no component to bind resource to");
                false
            }
        }
    }

    /// Visit every resource reference held by live components exactly once,
    /// ahead of a bulk arena reclaim. Returns the number of references seen.
    pub fn unmake_refs(&self, mut release: impl FnMut(ResourceHandle)) -> usize {
        let mut count = 0;
        let mut visit = |handle: Option<ResourceHandle>| {
            if let Some(handle) = handle {
                release(handle);
                count += 1;
            }
        };
        for pool in self.directory.pools() {
            let mask = pool.mask();
            for kind in mask.kinds() {
                match kind {
                    ComponentKind::Mesh => pool
                        .column_slice::<Mesh>()
                        .into_iter()
                        .flatten()
                        .for_each(|c| visit(c.resource)),
                    ComponentKind::Material => pool
                        .column_slice::<Material>()
                        .into_iter()
                        .flatten()
                        .for_each(|c| {
                            visit(c.resource);
                            visit(c.texture);
                        }),
                    ComponentKind::Armature => pool
                        .column_slice::<Armature>()
                        .into_iter()
                        .flatten()
                        .for_each(|c| visit(c.skeleton)),
                    ComponentKind::Clip => pool
                        .column_slice::<Clip>()
                        .into_iter()
                        .flatten()
                        .for_each(|c| visit(c.clip)),
                    ComponentKind::AudioSource => pool
                        .column_slice::<AudioSource>()
                        .into_iter()
                        .flatten()
                        .for_each(|c| visit(c.sound)),
                    _ => {}
                }
            }
        }
        debug!(scene = %self.name, references = count, "released resource references");
        count
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("entities", &self.entity_count())
            .field("pools", &self.pool_count())
            .field("systems", &self.systems)
            .field("arena", &self.arena)
            .finish()
    }
}
