// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Tests for hashing

use super::*;

use rand::{thread_rng, Rng};

fn random_hash() -> [u8; DIGEST_BYTES] {
    let mut results = crate::hash::EMPTY_DIGEST;
    thread_rng().fill(&mut results[..]);
    results
}

#[cfg(feature = "blake3")]
mod blake3_tests {
    use super::super::*;

    #[test]
    fn test_hash_validity() {
        let data = super::random_hash();
        let hash = hash(&data);
        let expected: [u8; DIGEST_BYTES] = ::blake3::hash(&data).into();

        assert_eq!(expected, hash);
    }
}

#[cfg(all(feature = "sha2", not(feature = "blake3")))]
mod sha256_tests {
    use super::super::*;
    use ::sha2::Digest;

    #[test]
    fn test_hash_validity() {
        let data = super::random_hash();
        let hash = hash(&data);
        let expected: [u8; DIGEST_BYTES] = ::sha2::Sha256::digest(data).into();

        assert_eq!(expected, hash);
    }

    #[test]
    fn test_empty_child_hash_known_value() {
        assert_eq!(
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925",
            hex::encode(empty_child_hash())
        );
    }
}

#[test]
fn test_merge_validity() {
    let hashes = [random_hash(), random_hash(), random_hash(), random_hash()];
    let merged = merge(&hashes);
    let data = hashes.concat();
    let expected = hash(&data);

    assert_eq!(expected, merged);
}

#[test]
fn test_hash_children_is_ordered() {
    let left = random_hash();
    let right = random_hash();

    assert_eq!(merge(&[left, right]), hash_children(&left, &right));
    assert_ne!(hash_children(&left, &right), hash_children(&right, &left));
}

#[test]
fn test_try_parse_digest() {
    let digest = random_hash();
    assert_eq!(Ok(digest), try_parse_digest(&digest));
    assert!(try_parse_digest(&digest[1..]).is_err());
    assert!(try_parse_digest(&[digest.to_vec(), vec![0u8]].concat()).is_err());
}
