//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use stage_ecs::prelude::*;
//! ```

pub use crate::arena::Arena;
pub use crate::bitset::ArchetypeMask;
pub use crate::builtin::{
    Armature, AudioSource, Camera, Clip, Material, Mesh, Player, Pose, RigidBody, Transform,
};
pub use crate::component::{Component, ComponentKind};
pub use crate::config::StageConfig;
pub use crate::entity::Entity;
pub use crate::error::EcsError;
pub use crate::frame::{
    FrameClock, FrameContext, InputSource, InputState, KeyCode, MouseButton, WindowSize,
};
pub use crate::hierarchy_system::register_builtin_systems;
pub use crate::query::Query;
pub use crate::resource::{ResourceHandle, ResourceKind, ResourceLookup, ResourceTable};
pub use crate::scene::Scene;
pub use crate::stage::Stage;
pub use crate::system::{BoxedSystem, FrameReport, System};
pub use glam::{Quat, Vec3};
