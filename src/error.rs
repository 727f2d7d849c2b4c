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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity not found
    EntityNotFound,

    /// Handle generation no longer matches its slot
    StaleEntity,

    /// Component not present on the entity
    ComponentNotFound,

    /// Arena budget cannot satisfy a reservation
    ArenaExhausted { requested: usize, remaining: usize },

    /// Every scene slot of the stage is in use
    SceneCapacityExhausted { capacity: usize },

    /// A scene with this name is already active
    DuplicateScene(String),

    /// No active scene carries this name
    SceneNotFound(String),

    /// Stage has no current scene
    NoCurrentScene,

    /// Hierarchy operation error (cycle, self-attach, etc.)
    HierarchyError(String),

    /// Scene user data may only be attached once
    UserDataAlreadySet,

    /// Resource label unknown to the lookup
    ResourceNotFound(String),

    /// Invalid stage configuration
    ConfigError(String),

    /// Log subscriber could not be installed
    LoggingError(String),
}

impl EcsError {
    /// Whether the condition is one the engine treats as unrecoverable.
    ///
    /// Callers decide whether to abort or propagate; the trigger points are
    /// arena exhaustion, scene slot exhaustion and duplicate scene names.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EcsError::ArenaExhausted { .. }
                | EcsError::SceneCapacityExhausted { .. }
                | EcsError::DuplicateScene(_)
        )
    }
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "Entity not found"),
            EcsError::StaleEntity => write!(f, "Stale entity handle"),
            EcsError::ComponentNotFound => write!(f, "Component not found"),
            EcsError::ArenaExhausted {
                requested,
                remaining,
            } => write!(
                f,
                "Arena exhausted: requested {requested} bytes, {remaining} remaining"
            ),
            EcsError::SceneCapacityExhausted { capacity } => {
                write!(f, "Scene capacity exhausted: all {capacity} slots in use")
            }
            EcsError::DuplicateScene(name) => write!(f, "Scene already exists: {name}"),
            EcsError::SceneNotFound(name) => write!(f, "Scene not found: {name}"),
            EcsError::NoCurrentScene => write!(f, "No current scene"),
            EcsError::HierarchyError(msg) => write!(f, "Hierarchy error: {msg}"),
            EcsError::UserDataAlreadySet => write!(f, "Scene user data already set"),
            EcsError::ResourceNotFound(label) => write!(f, "Resource not found: {label}"),
            EcsError::ConfigError(msg) => write!(f, "Config error: {msg}"),
            EcsError::LoggingError(msg) => write!(f, "Logging error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::ConfigError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
