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

//! System trait, registry and frame driver
//!
//! Systems run once per frame, single-threaded, strictly in registration
//! order. A system reports success with a boolean; a `false` is logged and
//! recorded in the [`FrameReport`] but never stops the systems after it.

#[cfg(feature = "profiling")]
use tracing::info_span;
use tracing::warn;

use crate::frame::FrameContext;
use crate::scene::Scene;

/// System trait
pub trait System {
    /// Get system name
    fn name(&self) -> &str;

    /// Run system logic against the scene; `false` reports a soft failure
    fn run(&mut self, scene: &mut Scene, frame: &FrameContext<'_>) -> bool;
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// System backed by a closure
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut Scene, &FrameContext<'_>) -> bool,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut Scene, &FrameContext<'_>) -> bool,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, scene: &mut Scene, frame: &FrameContext<'_>) -> bool {
        (self.func)(scene, frame)
    }
}

/// System carrying its own typed state between frames
pub struct ContextSystem<C, F> {
    name: String,
    context: C,
    func: F,
}

impl<C, F> ContextSystem<C, F>
where
    F: FnMut(&mut C, &mut Scene, &FrameContext<'_>) -> bool,
{
    pub fn new(name: impl Into<String>, context: C, func: F) -> Self {
        Self {
            name: name.into(),
            context,
            func,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C, F> System for ContextSystem<C, F>
where
    F: FnMut(&mut C, &mut Scene, &FrameContext<'_>) -> bool,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, scene: &mut Scene, frame: &FrameContext<'_>) -> bool {
        (self.func)(&mut self.context, scene, frame)
    }
}

/// Outcome of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Systems invoked
    pub ran: usize,
    /// Names of systems that returned `false`, in run order
    pub failed: Vec<String>,
}

impl FrameReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered list of systems
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<BoxedSystem>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system; names need not be unique.
    pub fn register(&mut self, system: BoxedSystem) {
        self.systems.push(system);
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|system| system.name())
    }

    /// Move every system of `later` behind the ones already registered.
    pub(crate) fn append(&mut self, later: &mut SystemRegistry) {
        self.systems.append(&mut later.systems);
    }

    /// Invoke every system once, in registration order.
    pub fn run(&mut self, scene: &mut Scene, frame: &FrameContext<'_>) -> FrameReport {
        let mut report = FrameReport::default();
        for system in &mut self.systems {
            #[cfg(feature = "profiling")]
            let _span = info_span!("system.run", system = system.name()).entered();

            report.ran += 1;
            if !system.run(scene, frame) {
                warn!(system = system.name(), frame = frame.frame, "system reported failure");
                report.failed.push(system.name().to_string());
            }
        }
        report
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn scene() -> Scene {
        Scene::new("test", Arena::new(1 << 20), 8)
    }

    #[test]
    fn test_context_system_keeps_state() {
        let mut scene = scene();
        let mut system = ContextSystem::new("counter", 0u32, |count: &mut u32, _: &mut Scene, _: &FrameContext<'_>| {
            *count += 1;
            true
        });
        let frame = FrameContext::headless(0.016);
        system.run(&mut scene, &frame);
        system.run(&mut scene, &frame);
        assert_eq!(*system.context(), 2);
        assert_eq!(system.name(), "counter");
    }

    #[test]
    fn test_failure_does_not_short_circuit() {
        let mut scene = scene();
        let mut registry = SystemRegistry::new();
        registry.register(Box::new(FnSystem::new("fails", |_: &mut Scene, _: &FrameContext<'_>| false)));
        registry.register(Box::new(FnSystem::new("spawns", |scene: &mut Scene, _: &FrameContext<'_>| {
            scene.new_entity(crate::bitset::ArchetypeMask::EMPTY).is_ok()
        })));

        let report = registry.run(&mut scene, &FrameContext::headless(0.016));
        assert_eq!(report.ran, 2);
        assert_eq!(report.failed, vec!["fails".to_string()]);
        assert!(!report.all_succeeded());
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut registry = SystemRegistry::new();
        registry.register(Box::new(FnSystem::new("same", |_: &mut Scene, _: &FrameContext<'_>| true)));
        registry.register(Box::new(FnSystem::new("same", |_: &mut Scene, _: &FrameContext<'_>| true)));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["same", "same"]);
    }
}
