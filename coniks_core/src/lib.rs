// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Core utilities for the `coniks` key-transparency directory and its clients.
//! Mainly contains (1) hashing utilities, (2) the record types shared between
//! server and client along with their canonical byte encodings, (3) signing
//! primitives for signed tree roots and (4) client-side proof verification.
//!
//! The default configuration hashes with SHA-256 (from the `sha2` crate). If you
//! wish to hash with blake3 instead, enable the `blake3` feature (ideally with
//! `default-features = false` in your Cargo.toml import).

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(feature = "sha2", feature = "blake3")))]
compile_error!("coniks_core requires one of the `sha256` or `blake3` features to be enabled");

pub mod crypto;
pub mod hash;
pub mod signing;
pub mod utils;
pub mod verify;

pub mod types;
pub use types::*;

/// The number of bits in a lookup index, which bounds the depth of the prefix tree
pub const INDEX_BITS: usize = hash::DIGEST_BYTES * 8;
