// Built-in components

pub mod components;
pub mod transform;

pub use components::{
    Armature, AudioSource, Camera, Clip, Material, Mesh, Player, Pose, RigidBody,
};
pub use transform::Transform;

use crate::component::{sealed::Sealed, Component, ComponentKind};

macro_rules! impl_component {
    ($($T:ident => $kind:ident),* $(,)?) => {
        $(
            impl Sealed for $T {}

            impl Component for $T {
                const KIND: ComponentKind = ComponentKind::$kind;
            }
        )*
    };
}

impl_component!(
    Transform => Transform,
    Mesh => Mesh,
    Material => Material,
    Armature => Armature,
    Clip => Clip,
    Pose => Pose,
    RigidBody => RigidBody,
    Camera => Camera,
    Player => Player,
    AudioSource => AudioSource,
);
