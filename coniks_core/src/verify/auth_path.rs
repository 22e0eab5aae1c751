// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Verification of authentication paths against a root hash

use super::VerificationError;

use crate::crypto::hash_leaf;
use crate::hash::{hash_children, Digest};
use crate::{AuthPath, Direction, LookupIndex, INDEX_BITS};

/// Recompute the root hash an authentication path commits to.
///
/// The leaf is hashed and folded upward: a sibling pruned on the left gives
/// `H(sibling || current)`, one pruned on the right gives `H(current || sibling)`.
/// The path is rejected before folding if its shape is inconsistent with the
/// leaf's lookup index.
pub fn compute_root_hash(proof: &AuthPath) -> Result<Digest, VerificationError> {
    let depth = proof.depth as usize;
    if depth == 0 || depth > INDEX_BITS {
        return Err(VerificationError::AuthPath(format!(
            "Leaf depth {depth} is out of range (1..={INDEX_BITS})"
        )));
    }
    if depth != proof.siblings.len() {
        return Err(VerificationError::AuthPath(format!(
            "Leaf depth {} does not match the {} siblings provided",
            depth,
            proof.siblings.len()
        )));
    }

    let index = LookupIndex::for_username(&proof.leaf.username);
    if index != proof.leaf.index {
        return Err(VerificationError::AuthPath(format!(
            "Lookup index {} is not the hash of username '{}'",
            proof.leaf.index, proof.leaf.username
        )));
    }

    let mut current = hash_leaf(&proof.leaf);
    for (level, sibling) in proof.siblings.iter().enumerate() {
        // siblings[0] hangs off the leaf's parent, which sits at depth - 1
        let parent_depth = depth - 1 - level;
        let expected_side = index.direction_at(parent_depth).other();
        if sibling.side != expected_side {
            return Err(VerificationError::AuthPath(format!(
                "Pruned sibling at depth {} is on the {:?}, expected the {:?}",
                parent_depth, sibling.side, expected_side
            )));
        }
        current = match sibling.side {
            Direction::Left => hash_children(&sibling.hash, &current),
            Direction::Right => hash_children(&current, &sibling.hash),
        };
    }
    Ok(current)
}

/// Verify that an authentication path proves its leaf under `root_hash`
pub fn verify_auth_path(root_hash: &Digest, proof: &AuthPath) -> Result<(), VerificationError> {
    let computed = compute_root_hash(proof)?;
    if &computed != root_hash {
        return Err(VerificationError::AuthPath(format!(
            "Computed root hash {} does not match the committed root hash {}",
            hex::encode(computed),
            hex::encode(root_hash)
        )));
    }
    Ok(())
}
