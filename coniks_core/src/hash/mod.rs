// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains all the hashing utilities needed for the directory
//! and verification operations

/// A hash digest of a specified number of bytes
pub type Digest = [u8; DIGEST_BYTES];
/// Represents an empty digest, with no data contained
pub const EMPTY_DIGEST: [u8; DIGEST_BYTES] = [0u8; DIGEST_BYTES];

// =========================================
// ========== Blake3 settings ==============
// =========================================
#[cfg(feature = "blake3")]
pub mod blake3;
#[cfg(feature = "blake3")]
pub use crate::hash::blake3::hash;
#[cfg(feature = "blake3")]
pub use crate::hash::blake3::DIGEST_BYTES;

// =========================================
// ========== Sha2 settings ===============
// =========================================
#[cfg(all(feature = "sha2", not(feature = "blake3")))]
pub mod sha2;
#[cfg(all(feature = "sha2", not(feature = "blake3")))]
pub use crate::hash::sha2::hash;
#[cfg(all(feature = "sha2", not(feature = "blake3")))]
pub use crate::hash::sha2::DIGEST_BYTES;

#[cfg(test)]
mod tests;

/// Try and parse a digest from an unknown length of bytes. Helpful for converting a `Vec<u8>`
/// to a [Digest]
pub fn try_parse_digest(value: &[u8]) -> Result<Digest, String> {
    if value.len() != DIGEST_BYTES {
        Err(format!(
            "Failed to parse Digest. Expected {} bytes but the value has {} bytes",
            DIGEST_BYTES,
            value.len()
        ))
    } else {
        let mut arr = EMPTY_DIGEST;
        arr.copy_from_slice(value);
        Ok(arr)
    }
}

/// Merge N hashes into a single Digest, hashing their concatenation
pub fn merge(items: &[Digest]) -> Digest {
    let data: Vec<u8> = items.iter().flat_map(|item| item.iter().copied()).collect();
    hash(&data)
}

/// The hash of an interior node: `H(left || right)`
pub fn hash_children(left: &Digest, right: &Digest) -> Digest {
    let mut data = [0u8; DIGEST_BYTES * 2];
    data[..DIGEST_BYTES].copy_from_slice(left);
    data[DIGEST_BYTES..].copy_from_slice(right);
    hash(&data)
}

/// The hash standing in for an empty child slot: the hash of an all-zero digest
pub fn empty_child_hash() -> Digest {
    hash(&EMPTY_DIGEST)
}
