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

//! Stage ECS - arena-backed archetype Entity Component System
//!
//! Entities are generational handles into a per-scene directory. Component
//! data lives in dense, arena-backed pools, one per archetype. Scenes carry a
//! parent/child transform hierarchy and an ordered list of per-frame systems.
//! A [`Stage`] manages a fixed number of scenes and forwards work to the
//! current one.
//!
//! ```
//! use stage_ecs::prelude::*;
//!
//! let mut stage = Stage::new(2, 4 << 20).unwrap();
//! let scene = stage.scene_new("level").unwrap();
//!
//! let player = scene.new_entity(ArchetypeMask::of(ComponentKind::Transform)).unwrap();
//! scene.add_component(player, Mesh::default()).unwrap();
//! scene.translate(player, Vec3::X);
//! scene.update_hierarchy(player);
//!
//! assert_eq!(scene.world_position(player), Some(Vec3::X));
//! ```

pub mod archetype;
pub mod arena;
pub mod bitset;
pub mod builtin;
pub mod component;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod frame;
pub mod hierarchy;
pub mod hierarchy_system;
#[cfg(feature = "profiling")]
pub mod logging;
pub mod prelude;
pub mod query;
pub mod resource;
pub mod scene;
pub mod stage;
pub mod system;

pub use archetype::*;
pub use arena::*;
pub use bitset::*;
pub use component::*;
pub use config::*;
pub use directory::*;
pub use entity::*;
pub use error::*;
pub use frame::*;
pub use hierarchy_system::*;
pub use query::*;
pub use resource::*;
pub use scene::*;
pub use stage::*;
pub use system::*;
