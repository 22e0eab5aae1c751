// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains all of the structs which are shared between the
//! directory server and its clients
//!
//! 1. User leaf records
//! 2. Authentication paths
//! 3. Signed tree root commitments

use crate::hash::Digest;
#[cfg(feature = "serde_serialization")]
use crate::utils::serde_helpers::{bytes_deserialize_hex, bytes_serialize_hex};

pub mod lookup_index;
pub use lookup_index::*;

// ============================================
// Typedefs and constants
// ============================================

/// This type is used to indicate a direction for a
/// particular node relative to its parent. We use
/// 0 to represent "left" and 1 to represent "right".
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
#[repr(u8)]
pub enum Direction {
    /// Left
    Left = 0u8,
    /// Right
    Right = 1u8,
}

impl Direction {
    /// Returns the opposite of the direction
    pub fn other(&self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl From<u8> for Direction {
    fn from(bit: u8) -> Self {
        if bit == 0 {
            Direction::Left
        } else {
            Direction::Right
        }
    }
}

/// The opaque public-key blob a user binds to their name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct KeyData(
    #[cfg_attr(
        feature = "serde_serialization",
        serde(serialize_with = "bytes_serialize_hex")
    )]
    #[cfg_attr(
        feature = "serde_serialization",
        serde(deserialize_with = "bytes_deserialize_hex")
    )]
    pub Vec<u8>,
);

impl core::ops::Deref for KeyData {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::convert::From<&str> for KeyData {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl core::convert::From<&String> for KeyData {
    fn from(s: &String) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl core::convert::From<Vec<u8>> for KeyData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// ============================================
// Structs
// ============================================

/// A user's binding as stored in a leaf of the prefix tree.
///
/// Records are immutable values once published: a key change on the server
/// produces a fresh copy of the record for the new epoch, leaving the copy
/// referenced by older epochs untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct UserLeafNode {
    /// The registered name
    pub username: String,
    /// The currently bound key data
    pub key_data: KeyData,
    /// Public key authorizing signed key changes, if any
    pub change_key: Option<Vec<u8>>,
    /// Whether key changes without a signature are accepted
    pub allows_unsigned_key_change: bool,
    /// Whether the binding may be looked up by anyone
    pub allows_public_lookup: bool,
    /// The epoch at which the name was first published
    pub epoch_added: u64,
    /// The epoch of the most recent published key change
    pub epoch_changed: u64,
    /// The message of the most recent key change
    pub last_change_message: Option<Vec<u8>>,
    /// The signature over `last_change_message`, for signed key changes
    pub last_change_signature: Option<Vec<u8>>,
    /// The lookup index, `H(username)`
    pub index: LookupIndex,
}

impl UserLeafNode {
    /// Build a fresh, not yet published, record for a registration.
    /// The epochs are stamped once the record is placed into a tree.
    pub fn new(
        username: &str,
        key_data: KeyData,
        change_key: Option<Vec<u8>>,
        allows_unsigned_key_change: bool,
        allows_public_lookup: bool,
    ) -> Self {
        Self {
            username: username.to_string(),
            key_data,
            change_key,
            allows_unsigned_key_change,
            allows_public_lookup,
            epoch_added: 0,
            epoch_changed: 0,
            last_change_message: None,
            last_change_signature: None,
            index: LookupIndex::for_username(username),
        }
    }
}

/// The hash of a subtree pruned from an authentication path, along with the
/// side of its parent it hangs off of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PrunedSibling {
    /// Which child of the parent interior node was pruned
    pub side: Direction,
    /// The hash of the pruned subtree
    pub hash: Digest,
}

/// Proof that a leaf is present in the tree with a given root hash.
///
/// `siblings` are ordered from the leaf upward: `siblings[0]` is the sibling
/// of the leaf itself and the last entry is a direct child of the root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AuthPath {
    /// The leaf being proven
    pub leaf: UserLeafNode,
    /// The pruned siblings, bottom first
    pub siblings: Vec<PrunedSibling>,
    /// The depth of the leaf below the root
    pub depth: u32,
}

/// The client's view of a signed tree root: everything needed to check the
/// server's signature and the hash chain, without the tree itself
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Commitment {
    /// The root hash of the tree for `epoch`
    pub root_hash: Digest,
    /// The epoch this root was published for
    pub epoch: u64,
    /// The epoch of the previous root (0 for the first root)
    pub prev_epoch: u64,
    /// The hash of the previous signed root (all zeros for the first root)
    pub prev_str_hash: Digest,
    /// The server's signature over the fields above
    #[cfg_attr(
        feature = "serde_serialization",
        serde(serialize_with = "bytes_serialize_hex")
    )]
    #[cfg_attr(
        feature = "serde_serialization",
        serde(deserialize_with = "bytes_deserialize_hex")
    )]
    pub signature: Vec<u8>,
}

impl Commitment {
    /// The bytes the server signs for this root
    pub fn to_signing_bytes(&self) -> Vec<u8> {
        crate::crypto::str_signing_bytes(
            &self.root_hash,
            self.epoch,
            self.prev_epoch,
            &self.prev_str_hash,
        )
    }

    /// The hash the next root must carry as `prev_str_hash`
    pub fn hash(&self) -> Digest {
        crate::crypto::str_hash(&self.to_signing_bytes(), &self.signature)
    }
}
