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

//! Fixed-width archetype bit set.
//! One bit per [`ComponentKind`]; a single `u32` word, so at most
//! [`MAX_COMPONENT_KINDS`] kinds can ever exist.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use crate::component::ComponentKind;

/// Hard limit on the number of component kinds
pub const MAX_COMPONENT_KINDS: usize = 32;

/// Set of component kinds an entity carries
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ArchetypeMask(u32);

impl ArchetypeMask {
    /// The empty archetype
    pub const EMPTY: ArchetypeMask = ArchetypeMask(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mask with exactly one kind
    pub const fn of(kind: ComponentKind) -> Self {
        Self(1 << kind as u32)
    }

    /// Mask with every kind in `kinds`
    pub fn from_kinds(kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |mask, &kind| mask.with(kind))
    }

    pub const fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | (1 << kind as u32))
    }

    pub const fn without(self, kind: ComponentKind) -> Self {
        Self(self.0 & !(1 << kind as u32))
    }

    /// Check if `kind` is in the set.
    pub const fn contains(self, kind: ComponentKind) -> bool {
        self.0 & (1 << kind as u32) != 0
    }

    /// True if every kind of `constraint` is also in `self`.
    pub const fn is_superset_of(self, constraint: ArchetypeMask) -> bool {
        self.0 & constraint.0 == constraint.0
    }

    /// Returns true if this set shares any kind with `other`.
    pub const fn intersects(self, other: ArchetypeMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Position of `kind` among the set's kinds, in ascending kind order.
    pub fn rank(self, kind: ComponentKind) -> Option<usize> {
        if !self.contains(kind) {
            return None;
        }
        let below = (1u32 << kind as u32) - 1;
        Some((self.0 & below).count_ones() as usize)
    }

    /// Returns iterator over the kinds in the set, ascending
    pub fn kinds(self) -> KindsIter {
        KindsIter { word: self.0 }
    }
}

impl BitOr for ArchetypeMask {
    type Output = ArchetypeMask;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for ArchetypeMask {
    type Output = ArchetypeMask;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<ComponentKind> for ArchetypeMask {
    fn from(kind: ComponentKind) -> Self {
        Self::of(kind)
    }
}

impl fmt::Debug for ArchetypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

pub struct KindsIter {
    word: u32,
}

impl Iterator for KindsIter {
    type Item = ComponentKind;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word != 0 {
            let trailing = self.word.trailing_zeros();
            self.word &= !(1 << trailing); // Clear the bit we just found
            if let Some(kind) = ComponentKind::from_index(trailing as usize) {
                return Some(kind);
            }
        }
        None
    }
}
