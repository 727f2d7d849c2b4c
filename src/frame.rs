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

//! Per-frame context handed to every system.
//!
//! The application loop owns the clock and the input backend; systems only
//! ever see a read-only [`FrameContext`].
//!
//! # Examples
//!
//! ```
//! use stage_ecs::frame::{FrameClock, InputState, KeyCode, WindowSize};
//! use std::time::Duration;
//!
//! let mut clock = FrameClock::new();
//! let mut input = InputState::new();
//! input.press(KeyCode::Space);
//!
//! clock.advance(Duration::from_millis(16));
//! let frame = clock.context(WindowSize::new(1280, 720), &input);
//! assert!(frame.key_down(KeyCode::Space));
//! ```

use std::time::{Duration, Instant};

use ahash::AHashSet;
use glam::Vec2;

/// Keyboard key codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A,
    D,
    E,
    Q,
    S,
    W,
    Space,
    Enter,
    Escape,
    Tab,
    Left,
    Right,
    Up,
    Down,
    LShift,
    LControl,
}

/// Mouse button codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Read-only input queries supplied by the platform layer
pub trait InputSource {
    fn key_down(&self, key: KeyCode) -> bool;
    fn button_down(&self, button: MouseButton) -> bool;
    fn cursor(&self) -> Vec2;
}

/// Input source with nothing pressed
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn key_down(&self, _key: KeyCode) -> bool {
        false
    }

    fn button_down(&self, _button: MouseButton) -> bool {
        false
    }

    fn cursor(&self) -> Vec2 {
        Vec2::ZERO
    }
}

static NO_INPUT: NoInput = NoInput;

/// Snapshot of pressed keys and buttons
#[derive(Clone, Debug, Default)]
pub struct InputState {
    keys: AHashSet<KeyCode>,
    buttons: AHashSet<MouseButton>,
    cursor: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    pub fn move_cursor(&mut self, position: Vec2) {
        self.cursor = position;
    }

    /// Reset all input state
    pub fn reset(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }
}

impl InputSource for InputState {
    fn key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor(&self) -> Vec2 {
        self.cursor
    }
}

/// Framebuffer dimensions in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Everything a system may read about the current frame
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Seconds since the clock started
    pub elapsed: f64,
    /// Seconds since the previous frame
    pub delta: f32,
    pub frame: u64,
    pub window: WindowSize,
    pub input: &'a dyn InputSource,
}

impl<'a> FrameContext<'a> {
    /// Frame with no window and no input, for headless runs and tests
    pub fn headless(delta: f32) -> FrameContext<'static> {
        FrameContext {
            elapsed: 0.0,
            delta,
            frame: 0,
            window: WindowSize::default(),
            input: &NO_INPUT,
        }
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.input.key_down(key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.input.button_down(button)
    }
}

impl std::fmt::Debug for FrameContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameContext")
            .field("elapsed", &self.elapsed)
            .field("delta", &self.delta)
            .field("frame", &self.frame)
            .field("window", &self.window)
            .finish()
    }
}

/// Monotonic frame clock
#[derive(Clone, Debug)]
pub struct FrameClock {
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    /// Time scale multiplier (1.0 = normal speed)
    time_scale: f32,
    last_update: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            time_scale: 1.0,
            last_update: Instant::now(),
        }
    }

    /// Sample the wall clock (call once per frame)
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.advance(now.duration_since(self.last_update));
        self.last_update = now;
    }

    /// Step by an explicit duration
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Get scaled delta time
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32() * self.time_scale
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Set time scale (1.0 = normal, 0.5 = half speed, 2.0 = double speed)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Build the context systems will see this frame.
    pub fn context<'a>(&self, window: WindowSize, input: &'a dyn InputSource) -> FrameContext<'a> {
        FrameContext {
            elapsed: self.elapsed.as_secs_f64(),
            delta: self.delta_seconds(),
            frame: self.frame_count,
            window,
            input,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
