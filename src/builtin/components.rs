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

//! Render, animation, physics and gameplay component data.
//!
//! Resource-bearing components only hold [`ResourceHandle`]s; the asset bytes
//! belong to the renderer or audio engine.

use glam::{Mat4, Vec3, Vec4};

use crate::resource::ResourceHandle;

/// Drawable mesh reference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mesh {
    pub resource: Option<ResourceHandle>,
    pub visible: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            resource: None,
            visible: true,
        }
    }
}

/// Surface material reference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub resource: Option<ResourceHandle>,
    /// Base color texture, bound separately from the material itself
    pub texture: Option<ResourceHandle>,
    pub tint: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            resource: None,
            texture: None,
            tint: Vec4::ONE,
        }
    }
}

/// Skeleton binding
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Armature {
    pub skeleton: Option<ResourceHandle>,
    pub bone_count: u16,
}

/// Animation clip playback state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clip {
    pub clip: Option<ResourceHandle>,
    pub time: f32,
    pub speed: f32,
    pub looping: bool,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            clip: None,
            time: 0.0,
            speed: 1.0,
            looping: true,
        }
    }
}

impl Clip {
    /// Advance playback by `delta` seconds, wrapping at `duration` when looping.
    pub fn advance(&mut self, delta: f32, duration: f32) {
        self.time += delta * self.speed;
        if duration <= 0.0 {
            self.time = 0.0;
        } else if self.looping {
            self.time = self.time.rem_euclid(duration);
        } else {
            self.time = self.time.clamp(0.0, duration);
        }
    }
}

/// Sampled pose parameters
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub clip_time: f32,
    pub blend: f32,
}

/// Point-mass body
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    pub velocity: Vec3,
    pub mass: f32,
    pub use_gravity: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            mass: 1.0,
            use_gravity: true,
        }
    }
}

/// Perspective camera
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Player-controlled marker with movement speed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Player {
    pub speed: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self { speed: 5.0 }
    }
}

/// Sound emitter reference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioSource {
    pub sound: Option<ResourceHandle>,
    pub volume: f32,
    pub looping: bool,
}

impl Default for AudioSource {
    fn default() -> Self {
        Self {
            sound: None,
            volume: 1.0,
            looping: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_advance_loops() {
        let mut clip = Clip::default();
        clip.advance(1.5, 1.0);
        assert!((clip.time - 0.5).abs() < 1e-5);

        clip.looping = false;
        clip.advance(10.0, 1.0);
        assert_eq!(clip.time, 1.0);
    }

    #[test]
    fn test_defaults() {
        assert!(Mesh::default().visible);
        assert_eq!(RigidBody::default().mass, 1.0);
        assert_eq!(AudioSource::default().volume, 1.0);
    }
}
