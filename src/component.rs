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

//! Component kinds and the Component trait
//!
//! The set of component kinds is closed and known at compile time. Each kind
//! owns one bit of an [`ArchetypeMask`](crate::bitset::ArchetypeMask) and maps
//! to exactly one plain-data type in [`crate::builtin`].

use std::alloc::Layout;

use crate::bitset::MAX_COMPONENT_KINDS;
use crate::builtin;

/// Tag for each component type the runtime can store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentKind {
    Transform = 0,
    Mesh = 1,
    Material = 2,
    Armature = 3,
    Clip = 4,
    Pose = 5,
    RigidBody = 6,
    Camera = 7,
    Player = 8,
    AudioSource = 9,
}

/// Number of defined component kinds
pub const COMPONENT_KIND_COUNT: usize = 10;

const _: () = assert!(COMPONENT_KIND_COUNT <= MAX_COMPONENT_KINDS);

pub(crate) mod sealed {
    /// Implemented only by the built-in component types
    pub trait Sealed {}
}

/// Marker trait for components
///
/// Components are plain data: copyable, default-constructible and free of
/// borrowed data. Values are moved between pools bytewise and never dropped,
/// which is what lets them live in arena memory.
///
/// The trait is sealed. Pool columns are laid out from `KIND`, so only the
/// type that `KIND` names may be stored under it:
///
/// ```compile_fail
/// use stage_ecs::prelude::*;
///
/// #[derive(Clone, Copy, Default)]
/// struct Big([f32; 16]);
///
/// impl Component for Big {
///     const KIND: ComponentKind = ComponentKind::Player;
/// }
/// ```
pub trait Component: sealed::Sealed + Copy + Default + 'static {
    const KIND: ComponentKind;
}

/// Run `$body` with `$T` aliased to the concrete type of `$kind`.
macro_rules! with_component_type {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            ComponentKind::Transform => {
                type $T = builtin::Transform;
                $body
            }
            ComponentKind::Mesh => {
                type $T = builtin::Mesh;
                $body
            }
            ComponentKind::Material => {
                type $T = builtin::Material;
                $body
            }
            ComponentKind::Armature => {
                type $T = builtin::Armature;
                $body
            }
            ComponentKind::Clip => {
                type $T = builtin::Clip;
                $body
            }
            ComponentKind::Pose => {
                type $T = builtin::Pose;
                $body
            }
            ComponentKind::RigidBody => {
                type $T = builtin::RigidBody;
                $body
            }
            ComponentKind::Camera => {
                type $T = builtin::Camera;
                $body
            }
            ComponentKind::Player => {
                type $T = builtin::Player;
                $body
            }
            ComponentKind::AudioSource => {
                type $T = builtin::AudioSource;
                $body
            }
        }
    };
}

impl ComponentKind {
    pub const ALL: [ComponentKind; COMPONENT_KIND_COUNT] = [
        ComponentKind::Transform,
        ComponentKind::Mesh,
        ComponentKind::Material,
        ComponentKind::Armature,
        ComponentKind::Clip,
        ComponentKind::Pose,
        ComponentKind::RigidBody,
        ComponentKind::Camera,
        ComponentKind::Player,
        ComponentKind::AudioSource,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Transform => "transform",
            ComponentKind::Mesh => "mesh",
            ComponentKind::Material => "material",
            ComponentKind::Armature => "armature",
            ComponentKind::Clip => "clip",
            ComponentKind::Pose => "pose",
            ComponentKind::RigidBody => "rigid_body",
            ComponentKind::Camera => "camera",
            ComponentKind::Player => "player",
            ComponentKind::AudioSource => "audio_source",
        }
    }

    /// Memory layout of one value of this kind
    pub fn layout(self) -> Layout {
        with_component_type!(self, T => Layout::new::<T>())
    }

    /// Write the default value of this kind to `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `self.layout()` and suitably aligned.
    pub(crate) unsafe fn write_default(self, dst: *mut u8) {
        with_component_type!(self, T => std::ptr::write(dst as *mut T, T::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_indices_match_all() {
        for (i, kind) in ComponentKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, i);
            assert_eq!(ComponentKind::from_index(i), Some(*kind));
        }
        assert_eq!(ComponentKind::from_index(COMPONENT_KIND_COUNT), None);
    }

    #[test]
    fn test_every_kind_layout_matches_its_type() {
        fn check<T: Component>() {
            assert_eq!(T::KIND.layout(), Layout::new::<T>(), "{}", T::KIND.name());
        }
        check::<builtin::Transform>();
        check::<builtin::Mesh>();
        check::<builtin::Material>();
        check::<builtin::Armature>();
        check::<builtin::Clip>();
        check::<builtin::Pose>();
        check::<builtin::RigidBody>();
        check::<builtin::Camera>();
        check::<builtin::Player>();
        check::<builtin::AudioSource>();
    }

    #[test]
    fn test_component_trait_kinds() {
        assert_eq!(builtin::Transform::KIND, ComponentKind::Transform);
        assert_eq!(builtin::Camera::KIND, ComponentKind::Camera);
        assert_eq!(
            ComponentKind::Transform.layout(),
            Layout::new::<builtin::Transform>()
        );
    }
}
