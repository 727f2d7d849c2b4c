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

//! Stage configuration

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Boot parameters of a [`Stage`](crate::stage::Stage)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Number of scene slots
    pub scene_capacity: usize,
    /// Bytes of the root arena, split evenly between slots
    pub arena_bytes: usize,
    /// Rows reserved when a component pool is first created
    pub initial_pool_rows: usize,
    /// Gravity given to every new scene
    pub gravity: [f32; 3],
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            scene_capacity: 8,
            arena_bytes: 64 * 1024 * 1024,
            initial_pool_rows: 64,
            gravity: [0.0, -9.81, 0.0],
        }
    }
}

impl StageConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StageConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scene_capacity == 0 {
            return Err(EcsError::ConfigError(
                "scene_capacity must be at least 1".into(),
            ));
        }
        if self.region_bytes() == 0 {
            return Err(EcsError::ConfigError(format!(
                "arena_bytes {} too small for {} scenes",
                self.arena_bytes, self.scene_capacity
            )));
        }
        Ok(())
    }

    /// Arena budget of one scene slot
    pub fn region_bytes(&self) -> usize {
        self.arena_bytes / self.scene_capacity.max(1)
    }

    pub fn gravity(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }
}
