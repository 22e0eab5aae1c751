// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Helper structs that are used for various data structures,
//! to make it easier to pass arguments around.

use crate::pending::KeyChange;

use coniks_core::hash::Digest;
use coniks_core::{KeyData, UserLeafNode};

/// Root hash of the tree and its associated epoch
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct EpochHash(pub u64, pub Digest);

impl EpochHash {
    /// Get the contained epoch
    pub fn epoch(&self) -> u64 {
        self.0
    }
    /// Get the contained hash
    pub fn hash(&self) -> Digest {
        self.1
    }
}

/// A request to register a new name
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct Registration {
    /// The name to register
    pub username: String,
    /// The key data to bind to it
    pub key_data: KeyData,
    /// Public key authorizing future signed key changes
    pub change_key: Option<Vec<u8>>,
    /// Whether future key changes may be unsigned
    pub allows_unsigned_key_change: bool,
    /// Whether anyone may look the binding up
    pub allows_public_lookup: bool,
}

impl Registration {
    /// A registration that accepts unsigned key changes and public lookups
    pub fn new(username: &str, key_data: KeyData) -> Self {
        Self {
            username: username.to_string(),
            key_data,
            change_key: None,
            allows_unsigned_key_change: true,
            allows_public_lookup: true,
        }
    }

    pub(crate) fn to_leaf(&self) -> UserLeafNode {
        UserLeafNode::new(
            &self.username,
            self.key_data.clone(),
            self.change_key.clone(),
            self.allows_unsigned_key_change,
            self.allows_public_lookup,
        )
    }
}

/// A request to change an existing binding. Signed changes sign the bytes
/// of [KeyChangeRequest::to_message_bytes].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct KeyChangeRequest {
    /// The name whose binding changes
    pub username: String,
    /// The new key data
    pub key_data: KeyData,
    /// The new change key
    pub change_key: Option<Vec<u8>>,
    /// The new unsigned-change policy
    pub allows_unsigned_key_change: bool,
    /// The new lookup visibility
    pub allows_public_lookup: bool,
}

impl KeyChangeRequest {
    /// A change of key data only, keeping the permissive defaults
    pub fn new(username: &str, key_data: KeyData) -> Self {
        Self {
            username: username.to_string(),
            key_data,
            change_key: None,
            allows_unsigned_key_change: true,
            allows_public_lookup: true,
        }
    }

    /// The canonical bytes a client signs with its change key
    pub fn to_message_bytes(&self) -> Vec<u8> {
        coniks_core::crypto::key_change_message_bytes(
            &self.username,
            &self.key_data,
            self.change_key.as_deref(),
            self.allows_unsigned_key_change,
            self.allows_public_lookup,
        )
    }

    pub(crate) fn to_key_change(&self, signature: Option<Vec<u8>>) -> KeyChange {
        KeyChange {
            key_data: self.key_data.clone(),
            change_key: self.change_key.clone(),
            allows_unsigned_key_change: self.allows_unsigned_key_change,
            allows_public_lookup: self.allows_public_lookup,
            message: self.to_message_bytes(),
            signature,
        }
    }
}

/// Acknowledgement of an accepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct PendingResponse {
    /// The earliest epoch the operation can be published in
    pub expected_epoch: u64,
    /// The directory's epoch interval in milliseconds
    pub epoch_interval_ms: u64,
}
