// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The nodes of the Merkle prefix tree.
//!
//! Children are held behind [Arc]s so that consecutive epochs share every
//! subtree an update did not touch. A node is only ever mutated through
//! [Arc::make_mut], which copies it first if an older epoch still refers to it.

use crate::errors::TreeError;

use coniks_core::crypto::hash_leaf;
use coniks_core::hash::{empty_child_hash, hash_children, Digest};
use coniks_core::{Direction, UserLeafNode};

use std::sync::Arc;

/// A child slot of an interior node
#[derive(Debug, Clone, Default)]
pub enum TreeNode {
    /// Nothing has been placed here yet
    #[default]
    Empty,
    /// An interior node with two child slots
    Interior(Arc<InteriorNode>),
    /// A user's record
    Leaf(Arc<UserLeafNode>),
}

impl TreeNode {
    /// Compute the hash of this node. Interior nodes must have fresh
    /// child hash caches; `depth` is only used for error reporting.
    pub fn compute_hash(&self, depth: usize) -> Result<Digest, TreeError> {
        match self {
            TreeNode::Empty => Ok(empty_child_hash()),
            TreeNode::Leaf(leaf) => Ok(hash_leaf(leaf)),
            TreeNode::Interior(node) => node.hash(depth),
        }
    }

    /// Whether this slot holds no node
    pub fn is_empty(&self) -> bool {
        matches!(self, TreeNode::Empty)
    }
}

/// An interior node of the prefix tree, caching the hashes of its children.
/// A `None` cache marks the child as modified since the hash was last computed.
#[derive(Debug, Clone, Default)]
pub struct InteriorNode {
    pub(crate) left: TreeNode,
    pub(crate) right: TreeNode,
    pub(crate) left_hash: Option<Digest>,
    pub(crate) right_hash: Option<Digest>,
}

impl InteriorNode {
    /// A new interior with two empty children and stale caches
    pub fn new() -> Self {
        Self::default()
    }

    /// The child in the given direction
    pub fn child(&self, direction: Direction) -> &TreeNode {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, direction: Direction) -> &mut TreeNode {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// The cached hash of the child in the given direction, `None` if stale
    pub fn child_hash(&self, direction: Direction) -> Option<Digest> {
        match direction {
            Direction::Left => self.left_hash,
            Direction::Right => self.right_hash,
        }
    }

    pub(crate) fn set_child_hash(&mut self, direction: Direction, hash: Digest) {
        match direction {
            Direction::Left => self.left_hash = Some(hash),
            Direction::Right => self.right_hash = Some(hash),
        }
    }

    pub(crate) fn invalidate(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.left_hash = None,
            Direction::Right => self.right_hash = None,
        }
    }

    /// `H(left_hash || right_hash)`, failing if either cache is stale
    pub fn hash(&self, depth: usize) -> Result<Digest, TreeError> {
        match (&self.left_hash, &self.right_hash) {
            (Some(left), Some(right)) => Ok(hash_children(left, right)),
            _ => Err(TreeError::StaleHash(depth)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coniks_core::KeyData;

    #[test]
    fn test_new_interior_is_stale() {
        let node = InteriorNode::new();
        assert!(node.left.is_empty() && node.right.is_empty());
        assert_eq!(Err(TreeError::StaleHash(3)), node.hash(3));
    }

    #[test]
    fn test_interior_hash_of_two_empty_children() -> Result<(), TreeError> {
        let mut node = InteriorNode::new();
        for direction in [Direction::Left, Direction::Right] {
            let hash = node.child(direction).compute_hash(1)?;
            node.set_child_hash(direction, hash);
        }
        assert_eq!(
            hash_children(&empty_child_hash(), &empty_child_hash()),
            node.hash(0)?
        );

        node.invalidate(Direction::Right);
        assert_eq!(None, node.child_hash(Direction::Right));
        assert!(node.hash(0).is_err());
        Ok(())
    }

    #[test]
    fn test_leaf_hash_is_record_hash() -> Result<(), TreeError> {
        let leaf = UserLeafNode::new("alice", KeyData::from("PK1"), None, true, true);
        let node = TreeNode::Leaf(Arc::new(leaf.clone()));
        assert_eq!(hash_leaf(&leaf), node.compute_hash(0)?);
        Ok(())
    }
}
