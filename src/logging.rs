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

//! Log subscriber setup
//!
//! The library only emits `tracing` events and spans. Applications that want
//! them printed either install their own subscriber or call [`init_logging`]
//! (requires the `profiling` feature):
//!
//! ```ignore
//! stage_ecs::logging::init_logging(tracing::Level::DEBUG)?;
//! ```

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::{EcsError, Result};

/// Install a global fmt subscriber printing events up to `level`.
///
/// Fails instead of panicking if another subscriber is already installed.
pub fn init_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
        .map_err(|err| EcsError::LoggingError(err.to_string()))
}
