// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of a CONIKS-style key transparency directory.
//!
//! # Overview
//! A key directory binds usernames to public key data. Bindings are stored in a
//! Merkle prefix tree indexed by the hash of each username, and once per
//! _epoch_ the server publishes a new version of the tree together with a
//! signed tree root (STR). Each STR commits to the tree's root hash and to the
//! previous STR, so the published roots form a hash chain a client can follow
//! backwards.
//!
//! Clients look a name up and receive an authentication path: the user's
//! leaf record plus the hashes of the pruned siblings along its path. Folding
//! the path up to the root and checking the STR signature proves the binding
//! is what the server committed to for that epoch. The verification side lives
//! in [coniks_core::verify] so it can be used without the server.
//!
//! ### Operations
//!
//! - [Registration](#registration): queue a new name for the next epoch.
//! - [Key changes](#key-changes): queue a change to an existing binding,
//! optionally signed with the binding's change key.
//! - [Lookups](#lookups): fetch an authentication path and the STR it proves against.
//! - [Epochs](#epochs): publish every queued operation as the next tree and STR.
//!
//! ### Asynchronicity
//!
//! All of the directory functions are `async` and must be `await`ed. In the
//! following examples the necessary `async` blocks are omitted for simplicity.
//!
//! ## Setup
//! A [`Directory`] needs a [`DirectoryConfig`], a signing key
//! ([`coniks_core::signing::HardCodedSigningKey`] here) and a [`Clock`] epochs
//! are read from.
//! ```
//! use coniks::{Directory, DirectoryConfig, ManualClock};
//! use coniks_core::signing::HardCodedSigningKey;
//!
//! # tokio_test::block_on(async {
//! let config = DirectoryConfig::with_epoch_interval(100);
//! let directory = Directory::new(config, HardCodedSigningKey, ManualClock::new(0))
//!     .await
//!     .expect("Could not create a new directory");
//! assert_eq!(0, directory.current_epoch().await);
//! # });
//! ```
//!
//! ## Registration
//! A registration is queued and reserves its name immediately. It becomes
//! visible once the next epoch is published.
//! ```
//! # use coniks::{Directory, DirectoryConfig, ManualClock};
//! # use coniks_core::signing::HardCodedSigningKey;
//! use coniks::Registration;
//! use coniks_core::KeyData;
//!
//! # tokio_test::block_on(async {
//! # let config = DirectoryConfig::with_epoch_interval(100);
//! # let directory = Directory::new(config, HardCodedSigningKey, ManualClock::new(0)).await.unwrap();
//! let response = directory
//!     .submit_registration(Registration::new("alice", KeyData::from("PK1")))
//!     .await
//!     .expect("Registration was rejected");
//! assert_eq!(100, response.expected_epoch);
//! # });
//! ```
//!
//! ## Key changes
//! A change is authorized against the published record. Records registered
//! with [`Registration::new`] accept unsigned changes; stricter records
//! carry a change key and require a signature over
//! [`KeyChangeRequest::to_message_bytes`].
//! ```
//! # use coniks::{Directory, DirectoryConfig, ManualClock, Registration};
//! # use coniks_core::signing::HardCodedSigningKey;
//! # use coniks_core::KeyData;
//! use coniks::KeyChangeRequest;
//!
//! # tokio_test::block_on(async {
//! # let config = DirectoryConfig::with_epoch_interval(100);
//! # let directory = Directory::new(config, HardCodedSigningKey, ManualClock::new(0)).await.unwrap();
//! # directory.submit_registration(Registration::new("alice", KeyData::from("PK1"))).await.unwrap();
//! # directory.advance_epoch().await.unwrap();
//! let request = KeyChangeRequest::new("alice", KeyData::from("PK2"));
//! directory
//!     .submit_key_change(request, None)
//!     .await
//!     .expect("Key change was rejected");
//! # });
//! ```
//!
//! ## Epochs
//! [`Directory::advance_epoch`] drains the queue, builds the next tree sharing
//! every untouched subtree with the previous one, and signs it. A background
//! [`EpochTimer`] does this once per configured interval.
//! ```
//! # use coniks::{Directory, DirectoryConfig, ManualClock, Registration};
//! # use coniks_core::signing::HardCodedSigningKey;
//! # use coniks_core::KeyData;
//! use coniks::EpochHash;
//!
//! # tokio_test::block_on(async {
//! # let config = DirectoryConfig::with_epoch_interval(100);
//! # let directory = Directory::new(config, HardCodedSigningKey, ManualClock::new(0)).await.unwrap();
//! # directory.submit_registration(Registration::new("alice", KeyData::from("PK1"))).await.unwrap();
//! let EpochHash(epoch, root_hash) = directory.advance_epoch().await.expect("Error publishing");
//! println!("Published epoch {} with root hash: {}", epoch, hex::encode(root_hash));
//! # });
//! ```
//!
//! ## Lookups
//! A lookup returns the authentication path from the tree in force at the
//! requested epoch. The client verifies it against the STR for that epoch.
//! ```
//! # use coniks::{Directory, DirectoryConfig, ManualClock, Registration};
//! # use coniks_core::signing::HardCodedSigningKey;
//! # use coniks_core::KeyData;
//! use coniks_core::verify::lookup_verify;
//!
//! # tokio_test::block_on(async {
//! # let config = DirectoryConfig::with_epoch_interval(100);
//! # let directory = Directory::new(config, HardCodedSigningKey, ManualClock::new(0)).await.unwrap();
//! # directory.submit_registration(Registration::new("alice", KeyData::from("PK1"))).await.unwrap();
//! # directory.advance_epoch().await.unwrap();
//! let (path, _) = directory.lookup("alice", 100).await.expect("Lookup failed");
//! let commitment = directory.get_commitment(100).await.unwrap().to_commitment();
//! let public_key = directory.get_public_key().await.unwrap();
//!
//! let leaf = lookup_verify(public_key.as_bytes(), &commitment, "alice", path)
//!     .expect("Proof did not verify");
//! assert_eq!(KeyData::from("PK1"), leaf.key_data);
//! # });
//! ```
//!
//! ## Hash functions
//! The hash function is chosen with cargo features: `sha256` (the default) or `blake3`.

#![warn(missing_docs)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod directory;
pub mod epoch;
pub mod errors;
pub mod helper_structs;
pub mod history;
pub mod pending;
pub mod prefix_tree;
pub mod tree_node;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

pub use config::DirectoryConfig;
pub use directory::Directory;
pub use epoch::{Clock, EpochState, EpochTimer, ManualClock, SystemClock};
pub use errors::{ConiksError, DirectoryError, EpochError, HistoryError, TreeError};
pub use helper_structs::{EpochHash, KeyChangeRequest, PendingResponse, Registration};
pub use history::{SignedTreeRoot, StrHistory};
pub use prefix_tree::{build_next_tree, InsertStats, RootNode};

pub use coniks_core::hash::Digest;
pub use coniks_core::{AuthPath, Commitment, KeyData, LookupIndex, UserLeafNode};
