// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains hashing utilities for sha2 hashing

use sha2::Digest;

/// The number of bytes in a digest for SHA2 256 hashes
pub const DIGEST_BYTES: usize = 32;

/// Hash a single byte array
pub fn hash(item: &[u8]) -> crate::hash::Digest {
    let digest = sha2::Sha256::digest(item);
    let mut out = crate::hash::EMPTY_DIGEST;
    out.copy_from_slice(&digest);
    out
}
