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

//! Stage: fixed set of scene slots and the current-scene cursor
//!
//! At boot the root budget is sliced into one equal region per slot, and each
//! region's memory is allocated right then. Scenes never grow their region
//! afterwards. Each slot is either free (holding its idle arena) or active
//! (holding a live scene built inside that arena). Free slots are claimed in
//! the order they were released; active scenes are listed in creation order.
//!
//! Every entity, query and system operation on the stage is forwarded to the
//! current scene. The stage itself holds no entity state.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
#[cfg(feature = "profiling")]
use tracing::info_span;
use tracing::{debug, error, info, warn};

use crate::arena::Arena;
use crate::bitset::ArchetypeMask;
use crate::component::Component;
use crate::config::StageConfig;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::frame::FrameContext;
use crate::query::Query;
use crate::scene::Scene;
use crate::system::FrameReport;

enum Slot {
    Free(Arena),
    Active(Scene),
}

/// Multi-scene manager
pub struct Stage {
    root: Arena,
    slots: Vec<Slot>,
    free: VecDeque<usize>,
    active: Vec<usize>,
    current: Option<usize>,
    config: StageConfig,
}

impl Stage {
    /// Boot a stage with `capacity` slots sharing `arena_bytes`.
    pub fn new(capacity: usize, arena_bytes: usize) -> Result<Self> {
        Self::with_config(StageConfig {
            scene_capacity: capacity,
            arena_bytes,
            ..StageConfig::default()
        })
    }

    pub fn with_config(config: StageConfig) -> Result<Self> {
        config.validate()?;
        let root = Arena::root(config.arena_bytes);
        let region = config.region_bytes();

        let mut slots = Vec::with_capacity(config.scene_capacity);
        for _ in 0..config.scene_capacity {
            slots.push(Slot::Free(root.slice(region)?));
        }
        debug!(
            slots = config.scene_capacity,
            region_bytes = region,
            "stage initialized"
        );

        Ok(Self {
            root,
            free: (0..slots.len()).collect(),
            slots,
            active: Vec::new(),
            current: None,
            config,
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Root arena the slot regions were sliced from
    pub fn root_arena(&self) -> &Arena {
        &self.root
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    fn scene_at(&self, index: usize) -> Option<&Scene> {
        match self.slots.get(index)? {
            Slot::Active(scene) => Some(scene),
            Slot::Free(_) => None,
        }
    }

    fn scene_at_mut(&mut self, index: usize) -> Option<&mut Scene> {
        match self.slots.get_mut(index)? {
            Slot::Active(scene) => Some(scene),
            Slot::Free(_) => None,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.active
            .iter()
            .copied()
            .find(|&index| self.scene_at(index).is_some_and(|scene| scene.name() == name))
    }

    /// Claim a free slot, build a scene named `name` in it and make it current.
    ///
    /// Both failures are fatal in the sense of [`EcsError::is_fatal`]: a
    /// duplicate name and running out of slots.
    pub fn scene_new(&mut self, name: &str) -> Result<&mut Scene> {
        if self.find(name).is_some() {
            error!(scene = name, "scene already exists");
            return Err(EcsError::DuplicateScene(name.to_string()));
        }
        let Some(index) = self.free.pop_front() else {
            error!(scene = name, capacity = self.capacity(), "no free scene slot");
            return Err(EcsError::SceneCapacityExhausted {
                capacity: self.capacity(),
            });
        };

        // Swap in an unbacked placeholder while the real arena moves into the scene
        let arena = match std::mem::replace(&mut self.slots[index], Slot::Free(Arena::root(0))) {
            Slot::Free(arena) => arena,
            Slot::Active(scene) => {
                // Free list and slot state disagree; put the scene back untouched
                self.slots[index] = Slot::Active(scene);
                return Err(EcsError::SceneCapacityExhausted {
                    capacity: self.capacity(),
                });
            }
        };
        let mut scene = Scene::new(name, arena, self.config.initial_pool_rows);
        scene.set_gravity(self.config.gravity());
        self.slots[index] = Slot::Active(scene);
        self.active.push(index);
        self.current = Some(index);
        info!(scene = name, slot = index, "scene created");

        self.scene_at_mut(index)
            .ok_or_else(|| EcsError::SceneNotFound(name.to_string()))
    }

    /// Tear down the scene named `name` and return its slot to the free list.
    ///
    /// The scene's arena is reset in one step; call
    /// [`Scene::unmake_refs`] first to release external resources. If the
    /// scene was current, the most recently created remaining scene becomes
    /// current.
    pub fn scene_remove(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.find(name) else {
            warn!(scene = name, "scene_remove: scene not found");
            return Err(EcsError::SceneNotFound(name.to_string()));
        };
        self.slots[index] = match std::mem::replace(&mut self.slots[index], Slot::Free(Arena::root(0))) {
            Slot::Active(scene) => {
                let mut arena = scene.into_arena();
                arena.release();
                Slot::Free(arena)
            }
            free => free,
        };
        self.active.retain(|&i| i != index);
        self.free.push_back(index);
        if self.current == Some(index) {
            self.current = self.active.last().copied();
        }
        info!(scene = name, slot = index, "scene removed");
        Ok(())
    }

    /// Make the scene named `name` current.
    pub fn set_current(&mut self, name: &str) -> Result<()> {
        match self.find(name) {
            Some(index) => {
                self.current = Some(index);
                debug!(scene = name, "current scene switched");
                Ok(())
            }
            None => {
                warn!(scene = name, "set_current: scene not found");
                Err(EcsError::SceneNotFound(name.to_string()))
            }
        }
    }

    pub fn current(&self) -> Option<&Scene> {
        self.scene_at(self.current?)
    }

    pub fn current_mut(&mut self) -> Option<&mut Scene> {
        self.scene_at_mut(self.current?)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current().map(Scene::name)
    }

    /// Names of active scenes in creation order
    pub fn active_scene_names(&self) -> Vec<&str> {
        self.active
            .iter()
            .filter_map(|&index| self.scene_at(index))
            .map(Scene::name)
            .collect()
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scene_at(self.find(name)?)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        let index = self.find(name)?;
        self.scene_at_mut(index)
    }

    fn current_or_err(&mut self) -> Result<&mut Scene> {
        self.current_mut().ok_or(EcsError::NoCurrentScene)
    }

    // Delegation to the current scene

    pub fn new_entity(&mut self, archetype: ArchetypeMask) -> Result<Entity> {
        self.current_or_err()?.new_entity(archetype)
    }

    pub fn remove_entity(&mut self, entity: Entity) -> Result<bool> {
        Ok(self.current_or_err()?.remove_entity(entity))
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        self.current_or_err()?.add_component(entity, value)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        self.current_or_err()?.remove_component::<T>(entity)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.current()?.get_component::<T>(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.current_mut()?.get_component_mut::<T>(entity)
    }

    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<()> {
        self.current_or_err()?.set_parent(entity, parent)
    }

    pub fn translate(&mut self, entity: Entity, delta: Vec3) -> Result<bool> {
        Ok(self.current_or_err()?.translate(entity, delta))
    }

    pub fn rotate(&mut self, entity: Entity, rotation: Quat) -> Result<bool> {
        Ok(self.current_or_err()?.rotate(entity, rotation))
    }

    pub fn update_hierarchy(&mut self, root: Entity) -> Result<usize> {
        Ok(self.current_or_err()?.update_hierarchy(root))
    }

    pub fn query(&mut self, constraint: ArchetypeMask) -> Result<Query<'_>> {
        Ok(self.current_or_err()?.query(constraint))
    }

    pub fn add_system<F>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: FnMut(&mut Scene, &FrameContext<'_>) -> bool + 'static,
    {
        self.current_or_err()?.add_system(name, func);
        Ok(())
    }

    pub fn main_camera(&self) -> Option<Entity> {
        self.current()?.main_camera()
    }

    pub fn set_main_camera(&mut self, entity: Entity) -> Result<()> {
        self.current_or_err()?.set_main_camera(entity)
    }

    /// Run one frame of the current scene's systems.
    pub fn run_frame(&mut self, frame: &FrameContext<'_>) -> Result<FrameReport> {
        #[cfg(feature = "profiling")]
        let _span = info_span!("stage.run_frame", frame = frame.frame).entered();

        let scene = self.current_or_err()?;
        Ok(scene.run_systems(frame))
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("capacity", &self.capacity())
            .field("free", &self.free.len())
            .field("active", &self.active_scene_names())
            .field("current", &self.current_name())
            .finish()
    }
}
