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

//! Transform component: local TRS plus the cached world matrix.

use glam::{Mat4, Quat, Vec3};

/// Local transform and cached world transform
///
/// `world` is only meaningful after the owning entity's hierarchy has been
/// updated; the entity directory tracks whether it is stale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub world: Mat4,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    /// Local matrix (scale, then rotation, then translation)
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Combine parent world matrix with local TRS
    pub fn compose(&self, parent_world: &Mat4) -> Mat4 {
        *parent_world * self.local_matrix()
    }

    pub fn world_position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world: Mat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_default() {
        let transform = Transform::default();
        assert_eq!(transform.translation, Vec3::ZERO);
        assert_eq!(transform.scale, Vec3::ONE);
        assert_eq!(transform.world, Mat4::IDENTITY);
    }

    #[test]
    fn test_compose_with_parent() {
        let parent = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let child = Transform::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let world = child.compose(&parent);
        assert!((world.w_axis.truncate() - Vec3::new(15.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_compose_rotated_parent() {
        let parent = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let child = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let world = child.compose(&parent);
        // +X rotated a quarter turn about Y lands on -Z
        assert!((world.w_axis.truncate() - Vec3::new(0.0, 0.0, -1.0)).length() < 0.001);
    }
}
