// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Canonical byte encodings of the records that get hashed or signed. Both the
//! server and the client must agree byte for byte on these.

use crate::hash::{hash, Digest};
use crate::utils::{i2osp_array, i2osp_option};
use crate::{KeyData, UserLeafNode};

/// Serialize a leaf record for hashing. Epochs are big-endian, flags are a
/// single byte, variable-length fields are length-prefixed.
pub fn leaf_to_bytes(leaf: &UserLeafNode) -> Vec<u8> {
    [
        i2osp_array(leaf.username.as_bytes()),
        i2osp_array(&leaf.key_data),
        leaf.epoch_added.to_be_bytes().to_vec(),
        leaf.epoch_changed.to_be_bytes().to_vec(),
        vec![leaf.allows_unsigned_key_change as u8],
        vec![leaf.allows_public_lookup as u8],
        i2osp_option(leaf.change_key.as_deref()),
        i2osp_option(leaf.last_change_signature.as_deref()),
        i2osp_option(leaf.last_change_message.as_deref()),
    ]
    .concat()
}

/// The hash of a leaf record
pub fn hash_leaf(leaf: &UserLeafNode) -> Digest {
    hash(&leaf_to_bytes(leaf))
}

/// The bytes the server signs for a signed tree root:
/// `root_hash || epoch || prev_epoch || prev_str_hash`
pub fn str_signing_bytes(
    root_hash: &Digest,
    epoch: u64,
    prev_epoch: u64,
    prev_str_hash: &Digest,
) -> Vec<u8> {
    [
        &root_hash[..],
        &epoch.to_be_bytes(),
        &prev_epoch.to_be_bytes(),
        &prev_str_hash[..],
    ]
    .concat()
}

/// The hash of a signed tree root, which links the next root to it
pub fn str_hash(signing_bytes: &[u8], signature: &[u8]) -> Digest {
    hash(&[signing_bytes, signature].concat())
}

/// The message a user signs with their change key to authorize a key change
pub fn key_change_message_bytes(
    username: &str,
    key_data: &KeyData,
    change_key: Option<&[u8]>,
    allows_unsigned_key_change: bool,
    allows_public_lookup: bool,
) -> Vec<u8> {
    [
        i2osp_array(username.as_bytes()),
        i2osp_array(key_data),
        i2osp_option(change_key),
        vec![allows_unsigned_key_change as u8],
        vec![allows_public_lookup as u8],
    ]
    .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::EMPTY_DIGEST;

    fn sample_leaf() -> UserLeafNode {
        let mut leaf = UserLeafNode::new("alice", KeyData::from("PK1"), None, true, true);
        leaf.epoch_added = 100;
        leaf.epoch_changed = 100;
        leaf
    }

    #[test]
    fn test_leaf_hash_covers_every_field() {
        let base = sample_leaf();
        let base_hash = hash_leaf(&base);

        let mut mutations: Vec<UserLeafNode> = vec![];
        let mut leaf = base.clone();
        leaf.key_data = KeyData::from("PK2");
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.username = "alicf".to_string();
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.epoch_added += 1;
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.epoch_changed += 1;
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.allows_unsigned_key_change = false;
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.allows_public_lookup = false;
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.change_key = Some(vec![]);
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.last_change_signature = Some(vec![1]);
        mutations.push(leaf);
        let mut leaf = base.clone();
        leaf.last_change_message = Some(vec![1]);
        mutations.push(leaf);

        for mutated in mutations {
            assert_ne!(base_hash, hash_leaf(&mutated), "{:?}", mutated);
        }
    }

    #[test]
    fn test_length_prefixing_prevents_field_shifting() {
        let a = UserLeafNode::new("ab", KeyData::from("c"), None, true, true);
        let b = UserLeafNode::new("a", KeyData::from("bc"), None, true, true);
        assert_ne!(leaf_to_bytes(&a), leaf_to_bytes(&b));
    }

    #[test]
    fn test_str_signing_bytes_layout() {
        let root = [7u8; 32];
        let bytes = str_signing_bytes(&root, 2, 1, &EMPTY_DIGEST);
        assert_eq!(32 + 8 + 8 + 32, bytes.len());
        assert_eq!(&root[..], &bytes[..32]);
        assert_eq!(&2u64.to_be_bytes()[..], &bytes[32..40]);
        assert_eq!(&1u64.to_be_bytes()[..], &bytes[40..48]);
        assert_eq!(&EMPTY_DIGEST[..], &bytes[48..]);
    }
}
