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

//! Resource lookup boundary
//!
//! Scenes never own asset bytes. They store [`ResourceHandle`]s handed out by
//! whatever implements [`ResourceLookup`] (the asset tables of the renderer or
//! audio engine). [`ResourceTable`] is a plain in-memory lookup.

use std::cell::Cell;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Category of an external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Mesh,
    Material,
    Texture,
    Clip,
    Skeleton,
    Sound,
}

/// Opaque reference to a resource owned by a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    kind: ResourceKind,
    index: u32,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, index: u32) -> Self {
        Self { kind, index }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Resolve a label into a resource handle
pub trait ResourceLookup {
    fn lookup(&self, kind: ResourceKind, label: &str) -> Option<ResourceHandle>;
}

/// Lookup statistics
#[derive(Clone, Debug, Default)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
}

/// In-memory label table
#[derive(Debug, Default)]
pub struct ResourceTable {
    entries: AHashMap<(ResourceKind, String), ResourceHandle>,
    next_index: u32,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `label`, returning its handle. Registering twice returns the
    /// first handle.
    pub fn insert(&mut self, kind: ResourceKind, label: &str) -> ResourceHandle {
        if let Some(handle) = self.entries.get(&(kind, label.to_string())) {
            return *handle;
        }
        let handle = ResourceHandle::new(kind, self.next_index);
        self.next_index += 1;
        self.entries.insert((kind, label.to_string()), handle);
        handle
    }

    /// Like [`ResourceLookup::lookup`], but a miss is an error.
    pub fn resolve(&self, kind: ResourceKind, label: &str) -> Result<ResourceHandle> {
        self.lookup(kind, label)
            .ok_or_else(|| EcsError::ResourceNotFound(format!("{kind:?} '{label}'")))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}

impl ResourceLookup for ResourceTable {
    fn lookup(&self, kind: ResourceKind, label: &str) -> Option<ResourceHandle> {
        let found = self.entries.get(&(kind, label.to_string())).copied();
        match found {
            Some(_) => self.hits.set(self.hits.get() + 1),
            None => self.misses.set(self.misses.get() + 1),
        }
        found
    }
}
