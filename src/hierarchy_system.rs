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

//! Built-in systems: rigid body gravity and transform propagation

use crate::bitset::ArchetypeMask;
use crate::builtin::{RigidBody, Transform};
use crate::component::ComponentKind;
use crate::frame::FrameContext;
use crate::scene::Scene;
use crate::system::{FnSystem, System};

pub const GRAVITY_SYSTEM: &str = "gravity";
pub const TRANSFORM_PROPAGATION_SYSTEM: &str = "transform_propagation";

/// Integrate gravity into every rigid body and move its transform.
pub fn gravity_system(scene: &mut Scene, frame: &FrameContext<'_>) -> bool {
    let gravity = scene.gravity();
    let delta = frame.delta;
    let mask = ArchetypeMask::from_kinds(&[ComponentKind::Transform, ComponentKind::RigidBody]);

    let mut query = scene.query(mask);
    while query.next() {
        let Some((transform, body)) = query.get_pair_mut::<Transform, RigidBody>() else {
            continue;
        };
        if body.use_gravity {
            body.velocity += gravity * delta;
        }
        if body.velocity == glam::Vec3::ZERO {
            continue;
        }
        transform.translation += body.velocity * delta;
        query.mark_dirty();
    }
    true
}

/// Refresh cached world transforms of every dirty subtree.
pub fn transform_propagation_system(scene: &mut Scene, _frame: &FrameContext<'_>) -> bool {
    scene.update_all_hierarchies();
    true
}

/// Register gravity then transform propagation, in that order, so bodies
/// moved this frame have fresh world transforms before later systems run.
pub fn register_builtin_systems(scene: &mut Scene) {
    scene.register_system(builtin_system(GRAVITY_SYSTEM, gravity_system));
    scene.register_system(builtin_system(
        TRANSFORM_PROPAGATION_SYSTEM,
        transform_propagation_system,
    ));
}

fn builtin_system(
    name: &str,
    func: fn(&mut Scene, &FrameContext<'_>) -> bool,
) -> Box<dyn System> {
    Box::new(FnSystem::new(name, func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use glam::Vec3;

    #[test]
    fn test_gravity_moves_bodies_and_children() {
        let mut scene = Scene::new("physics", Arena::new(1 << 20), 8);
        register_builtin_systems(&mut scene);
        assert_eq!(
            scene.system_names(),
            vec![GRAVITY_SYSTEM, TRANSFORM_PROPAGATION_SYSTEM]
        );

        let t = ArchetypeMask::of(ComponentKind::Transform);
        let body = scene.new_entity(t.with(ComponentKind::RigidBody)).unwrap();
        let attached = scene.new_entity(t).unwrap();
        scene.set_parent(attached, Some(body)).unwrap();
        let resting = scene.new_entity(t.with(ComponentKind::RigidBody)).unwrap();
        scene.get_component_mut::<RigidBody>(resting).unwrap().use_gravity = false;

        let report = scene.run_systems(&FrameContext::headless(1.0));
        assert!(report.all_succeeded());

        assert_eq!(scene.get_component::<RigidBody>(body).unwrap().velocity.y, -9.81);
        assert!((scene.world_position(body).unwrap().y + 9.81).abs() < 1e-4);
        assert!((scene.world_position(attached).unwrap().y + 9.81).abs() < 1e-4);
        assert_eq!(scene.world_position(resting), Some(Vec3::ZERO));
        assert!(!scene.is_dirty(body));
    }
}
