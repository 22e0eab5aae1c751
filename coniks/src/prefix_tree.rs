// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of the Merkle prefix tree holding one epoch's bindings.
//!
//! Leaves sit at the shortest prefix of their lookup index that no other
//! index shares, so the shape of the tree depends only on the set of names it
//! holds and not on the order they were inserted in.

use crate::errors::TreeError;
use crate::pending::{Operation, PendingEntry};
use crate::tree_node::{InteriorNode, TreeNode};

use coniks_core::hash::Digest;
use coniks_core::{AuthPath, Direction, LookupIndex, PrunedSibling, UserLeafNode, INDEX_BITS};

use log::{debug, warn};
use std::sync::Arc;

/// Counters describing the work done by one [RootNode::insert_batch] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    /// Interior nodes copied because an older epoch still shared them
    pub interiors_copied: u64,
    /// Interior nodes created by splitting a leaf slot
    pub interiors_created: u64,
    /// New leaves placed
    pub leaves_inserted: u64,
    /// Leaves whose record was changed
    pub leaves_changed: u64,
    /// Key changes that failed authorization against the in-batch record
    pub changes_rejected: u64,
}

/// The root of one epoch's prefix tree. The root is always an interior node.
#[derive(Debug, Clone)]
pub struct RootNode {
    pub(crate) interior: InteriorNode,
    /// The epoch this tree was built for
    pub epoch: u64,
    /// The root hash of the previous epoch's tree, for continuity
    pub prev_root_hash: Option<Digest>,
    num_leaves: u64,
}

impl RootNode {
    /// A tree with no leaves. Its hashes are computed, so it can be published as-is.
    pub fn empty(epoch: u64) -> Result<Self, TreeError> {
        let mut root = Self {
            interior: InteriorNode::new(),
            epoch,
            prev_root_hash: None,
            num_leaves: 0,
        };
        root.recompute_hashes()?;
        Ok(root)
    }

    /// Start the next epoch's tree from this one. Only the root is copied;
    /// every subtree is shared until an insertion touches it.
    pub(crate) fn next_version(&self, epoch: u64) -> Result<Self, TreeError> {
        Ok(Self {
            interior: self.interior.clone(),
            epoch,
            prev_root_hash: Some(self.root_hash()?),
            num_leaves: self.num_leaves,
        })
    }

    /// The number of users in the tree
    pub fn len(&self) -> u64 {
        self.num_leaves
    }

    /// Whether the tree has no users
    pub fn is_empty(&self) -> bool {
        self.num_leaves == 0
    }

    /// The root hash, `H(left || right)` over the root's children
    pub fn root_hash(&self) -> Result<Digest, TreeError> {
        self.interior.hash(0)
    }

    /// Find the record of `username`. A leaf holding a different name that
    /// merely shares a prefix with the searched index is not a match.
    pub fn lookup(&self, username: &str) -> Option<&UserLeafNode> {
        let index = LookupIndex::for_username(username);
        let mut node = &self.interior;
        for depth in 0..INDEX_BITS {
            match node.child(index.direction_at(depth)) {
                TreeNode::Empty => return None,
                TreeNode::Leaf(leaf) => {
                    return if leaf.username == username {
                        Some(&**leaf)
                    } else {
                        None
                    }
                }
                TreeNode::Interior(next) => node = next,
            }
        }
        None
    }

    /// Apply a batch of operations, stamping new and changed records with
    /// this tree's epoch. Hash caches along every touched path are left stale;
    /// call [RootNode::recompute_hashes] before publishing.
    ///
    /// Fails on any structural violation, leaving the tree partially updated.
    /// Callers build on a fresh [RootNode::next_version] and discard it on error.
    pub fn insert_batch(&mut self, entries: &[PendingEntry]) -> Result<InsertStats, TreeError> {
        let mut batch: Vec<&PendingEntry> = entries.iter().collect();
        batch.sort_unstable_by_key(|entry| entry.sort_key());

        let mut stats = InsertStats::default();
        for entry in batch {
            insert_at(&mut self.interior, 0, entry, self.epoch, &mut stats)?;
        }
        self.num_leaves += stats.leaves_inserted;
        debug!(
            "Inserted batch of {} operations at epoch {}: {:?}",
            entries.len(),
            self.epoch,
            stats
        );
        Ok(stats)
    }

    /// Recompute every stale hash cache, bottom up, and return the root hash.
    /// Subtrees with fresh caches are not visited, so the cost is proportional
    /// to the paths modified since the last call.
    pub fn recompute_hashes(&mut self) -> Result<Digest, TreeError> {
        recompute(&mut self.interior, 0)?;
        self.root_hash()
    }

    /// Produce the authentication path for `username`, or `None` if the name is
    /// not in the tree. Requires fresh hashes.
    pub fn get_auth_path(&self, username: &str) -> Result<Option<AuthPath>, TreeError> {
        let index = LookupIndex::for_username(username);
        let mut siblings = Vec::new();
        let mut node = &self.interior;
        for depth in 0..INDEX_BITS {
            let direction = index.direction_at(depth);
            let pruned = direction.other();
            if node.child_hash(direction).is_none() {
                return Err(TreeError::StaleHash(depth + 1));
            }
            let hash = node
                .child_hash(pruned)
                .ok_or(TreeError::StaleHash(depth + 1))?;
            siblings.push(PrunedSibling { side: pruned, hash });

            match node.child(direction) {
                TreeNode::Empty => return Ok(None),
                TreeNode::Leaf(leaf) if leaf.username == username => {
                    // collected root first; proofs are ordered leaf first
                    siblings.reverse();
                    return Ok(Some(AuthPath {
                        leaf: UserLeafNode::clone(leaf),
                        siblings,
                        depth: (depth + 1) as u32,
                    }));
                }
                TreeNode::Leaf(_) => return Ok(None),
                TreeNode::Interior(next) => node = next,
            }
        }
        Err(TreeError::DepthExceeded(index))
    }
}

fn insert_at(
    node: &mut InteriorNode,
    depth: usize,
    entry: &PendingEntry,
    epoch: u64,
    stats: &mut InsertStats,
) -> Result<(), TreeError> {
    if depth >= INDEX_BITS {
        return Err(TreeError::DepthExceeded(entry.index));
    }
    let direction = entry.index.direction_at(depth);
    node.invalidate(direction);
    let slot = node.child_mut(direction);

    match slot {
        TreeNode::Empty => match &entry.operation {
            Operation::Register(leaf) => {
                let mut leaf = leaf.clone();
                leaf.epoch_added = epoch;
                leaf.epoch_changed = epoch;
                *slot = TreeNode::Leaf(Arc::new(leaf));
                stats.leaves_inserted += 1;
                Ok(())
            }
            Operation::KeyChange(_) => Err(TreeError::MissingLeaf(entry.username.clone())),
        },
        TreeNode::Interior(child) => {
            if Arc::get_mut(child).is_none() {
                stats.interiors_copied += 1;
            }
            insert_at(Arc::make_mut(child), depth + 1, entry, epoch, stats)
        }
        TreeNode::Leaf(existing) if existing.username == entry.username => {
            match &entry.operation {
                Operation::Register(_) => {
                    Err(TreeError::DuplicateRegistration(entry.username.clone()))
                }
                Operation::KeyChange(change) => {
                    if let Err(reason) = change.authorize(existing) {
                        warn!(
                            "Dropping key change for '{}' at epoch {}: {}",
                            entry.username, epoch, reason
                        );
                        stats.changes_rejected += 1;
                        return Ok(());
                    }
                    change.apply(Arc::make_mut(existing), epoch);
                    stats.leaves_changed += 1;
                    Ok(())
                }
            }
        }
        TreeNode::Leaf(existing) => {
            if existing.index == entry.index {
                return Err(TreeError::IndexCollision(
                    existing.username.clone(),
                    entry.username.clone(),
                    entry.index,
                ));
            }
            if let Operation::KeyChange(_) = entry.operation {
                return Err(TreeError::MissingLeaf(entry.username.clone()));
            }
            // Push the resident leaf one level down and keep descending with
            // the new one until their indices diverge.
            let existing = Arc::clone(existing);
            let side = existing.index.direction_at(depth + 1);
            let mut split = InteriorNode::new();
            *split.child_mut(side) = TreeNode::Leaf(existing);
            stats.interiors_created += 1;
            insert_at(&mut split, depth + 1, entry, epoch, stats)?;
            *slot = TreeNode::Interior(Arc::new(split));
            Ok(())
        }
    }
}

fn recompute(node: &mut InteriorNode, depth: usize) -> Result<(), TreeError> {
    for direction in [Direction::Left, Direction::Right] {
        if node.child_hash(direction).is_some() {
            continue;
        }
        let hash = match node.child_mut(direction) {
            TreeNode::Interior(child) => {
                // stale nodes were made unique on insertion, so this never copies
                let child = Arc::make_mut(child);
                recompute(child, depth + 1)?;
                child.hash(depth + 1)?
            }
            other => other.compute_hash(depth + 1)?,
        };
        node.set_child_hash(direction, hash);
    }
    Ok(())
}

/// Sort a batch and insert it on top of `prev`, returning the next epoch's
/// tree with fresh hashes
pub fn build_next_tree(
    prev: &RootNode,
    entries: &[PendingEntry],
    epoch: u64,
) -> Result<(RootNode, InsertStats), TreeError> {
    let mut root = prev.next_version(epoch)?;
    let stats = root.insert_batch(entries)?;
    root.recompute_hashes()?;
    Ok((root, stats))
}
