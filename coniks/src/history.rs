// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The hash chain of signed tree roots (STRs), one per epoch.
//!
//! Each STR owns its epoch's tree and points back to its predecessor, so the
//! history is a singly linked list walked from the newest root.

use crate::errors::HistoryError;
use crate::prefix_tree::RootNode;

use coniks_core::crypto::{str_hash, str_signing_bytes};
use coniks_core::hash::{Digest, EMPTY_DIGEST};
use coniks_core::signing::{SigningError, SigningKeyStorage};
use coniks_core::Commitment;

use std::sync::Arc;

/// A signed commitment to one epoch's tree
#[derive(Debug)]
pub struct SignedTreeRoot {
    root: Arc<RootNode>,
    root_hash: Digest,
    epoch: u64,
    prev_epoch: u64,
    prev_str_hash: Digest,
    signature: Vec<u8>,
    prev: Option<Arc<SignedTreeRoot>>,
}

impl SignedTreeRoot {
    /// Sign `root` as the successor of `prev`, or as the first root of a
    /// history when `prev` is `None`
    pub async fn sign<S: SigningKeyStorage>(
        root: Arc<RootNode>,
        prev: Option<Arc<SignedTreeRoot>>,
        signer: &S,
    ) -> Result<Self, SignedTreeRootError> {
        let root_hash = root.root_hash().map_err(SignedTreeRootError::Tree)?;
        let (prev_epoch, prev_str_hash) = match &prev {
            Some(prev) => (prev.epoch, prev.hash()),
            None => (0, EMPTY_DIGEST),
        };
        let epoch = root.epoch;
        let message = str_signing_bytes(&root_hash, epoch, prev_epoch, &prev_str_hash);
        let signature = signer
            .sign(&message)
            .await
            .map_err(SignedTreeRootError::Signing)?;
        Ok(Self {
            root,
            root_hash,
            epoch,
            prev_epoch,
            prev_str_hash,
            signature,
            prev,
        })
    }

    /// The tree this root commits to
    pub fn root(&self) -> &Arc<RootNode> {
        &self.root
    }

    /// The root hash of the tree
    pub fn root_hash(&self) -> Digest {
        self.root_hash
    }

    /// The epoch of this root
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The epoch of the previous root, 0 for the first root
    pub fn prev_epoch(&self) -> u64 {
        self.prev_epoch
    }

    /// The hash of the previous root, all zeros for the first root
    pub fn prev_str_hash(&self) -> Digest {
        self.prev_str_hash
    }

    /// The server's signature
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The previous root in the chain
    pub fn prev(&self) -> Option<&Arc<SignedTreeRoot>> {
        self.prev.as_ref()
    }

    /// The hash of this root, which the next root carries as `prev_str_hash`
    pub fn hash(&self) -> Digest {
        let message = str_signing_bytes(
            &self.root_hash,
            self.epoch,
            self.prev_epoch,
            &self.prev_str_hash,
        );
        str_hash(&message, &self.signature)
    }

    /// The client's view of this root
    pub fn to_commitment(&self) -> Commitment {
        Commitment {
            root_hash: self.root_hash,
            epoch: self.epoch,
            prev_epoch: self.prev_epoch,
            prev_str_hash: self.prev_str_hash,
            signature: self.signature.clone(),
        }
    }
}

impl Drop for SignedTreeRoot {
    fn drop(&mut self) {
        // Unlink the chain iteratively so long histories don't recurse once per epoch
        let mut prev = self.prev.take();
        while let Some(node) = prev {
            match Arc::try_unwrap(node) {
                Ok(mut inner) => prev = inner.prev.take(),
                Err(_) => break,
            }
        }
    }
}

/// Errors producing a signed tree root
#[derive(Debug)]
pub enum SignedTreeRootError {
    /// The tree's hashes were not fresh
    Tree(crate::errors::TreeError),
    /// The signer failed
    Signing(SigningError),
}

impl From<SignedTreeRootError> for crate::errors::ConiksError {
    fn from(error: SignedTreeRootError) -> Self {
        match error {
            SignedTreeRootError::Tree(err) => Self::Tree(err),
            SignedTreeRootError::Signing(err) => Self::Signing(err),
        }
    }
}

/// The chain of signed tree roots, newest first
#[derive(Debug)]
pub struct StrHistory {
    head: Arc<SignedTreeRoot>,
    first_epoch: u64,
    epoch_interval: u64,
    len: usize,
}

impl StrHistory {
    /// Start a history with its first root
    pub fn init(first: SignedTreeRoot, epoch_interval: u64) -> Self {
        Self {
            first_epoch: first.epoch,
            head: Arc::new(first),
            epoch_interval,
            len: 1,
        }
    }

    /// Append the next root. It must be at least one interval after the
    /// current head and must name the head as its predecessor.
    pub fn advance(&mut self, next: SignedTreeRoot) -> Result<Arc<SignedTreeRoot>, HistoryError> {
        let current = self.head.epoch;
        let earliest = current.saturating_add(self.epoch_interval);
        if next.epoch < earliest {
            return Err(HistoryError::EpochTooEarly {
                current,
                attempted: next.epoch,
                interval: self.epoch_interval,
            });
        }
        let links_to_head = matches!(&next.prev, Some(prev) if Arc::ptr_eq(prev, &self.head));
        if !links_to_head || next.prev_epoch != current || next.prev_str_hash != self.head.hash() {
            return Err(HistoryError::BrokenLink(next.epoch));
        }
        self.head = Arc::new(next);
        self.len += 1;
        Ok(self.head.clone())
    }

    /// The most recent root at or before `epoch`. Requests past the current
    /// epoch are answered with the current root.
    pub fn get(&self, epoch: u64) -> Result<Arc<SignedTreeRoot>, HistoryError> {
        let mut candidate = Some(&self.head);
        while let Some(signed) = candidate {
            if signed.epoch <= epoch {
                return Ok(signed.clone());
            }
            candidate = signed.prev.as_ref();
        }
        Err(HistoryError::ChainExhausted(epoch))
    }

    /// The newest root
    pub fn current(&self) -> Arc<SignedTreeRoot> {
        self.head.clone()
    }

    /// The epoch of the newest root
    pub fn current_epoch(&self) -> u64 {
        self.head.epoch
    }

    /// The epoch of the first root
    pub fn first_epoch(&self) -> u64 {
        self.first_epoch
    }

    /// The earliest epoch the next root may carry
    pub fn next_epoch(&self) -> u64 {
        self.head.epoch.saturating_add(self.epoch_interval)
    }

    /// The number of roots in the chain
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: a history holds at least its first root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Walk the chain from the newest root back to the first
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SignedTreeRoot>> {
        std::iter::successors(Some(&self.head), |signed| signed.prev.as_ref())
    }
}
