// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The lookup index of a user: the position of their leaf in the prefix tree

use crate::hash::{Digest, DIGEST_BYTES};
use crate::Direction;


/// The hash of a username. Bit `i` of the index (most significant bit of
/// byte 0 first) selects the child taken at depth `i` of the prefix tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct LookupIndex(pub Digest);

impl LookupIndex {
    /// Compute the lookup index of a username
    pub fn for_username(username: &str) -> Self {
        Self(crate::hash::hash(username.as_bytes()))
    }

    /// Returns the bit at a specified index. Out of range indices
    /// return 0
    pub fn get_bit_at(&self, index: usize) -> u8 {
        if index >= DIGEST_BYTES * 8 {
            return 0;
        }
        (self.0[index / 8] >> (7 - index % 8)) & 1
    }

    /// The child direction taken at `depth` when descending to this index
    pub fn direction_at(&self, depth: usize) -> Direction {
        Direction::from(self.get_bit_at(depth))
    }

    /// The leading 24 bits of the index as an unsigned integer
    pub fn prefix24(&self) -> u32 {
        u32::from_be_bytes([0, self.0[0], self.0[1], self.0[2]])
    }

    /// The raw bytes of the index
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for LookupIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "LookupIndex({})", hex::encode(self.0))
    }
}

impl core::fmt::Display for LookupIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
