// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains verification calls for the proofs and commitments
//! handed out by the directory

pub mod auth_path;
pub mod commitment;
pub mod lookup;


/// Proof verification error types
#[derive(Debug, Eq, PartialEq)]
pub enum VerificationError {
    /// Error verifying an authentication path
    AuthPath(String),
    /// Error verifying the signature on a signed tree root
    Commitment(String),
    /// Two signed tree roots do not form a valid hash chain
    StrChain(String),
    /// Error verifying a lookup result against its commitment
    LookupProof(String),
    /// A key change was not authorized by the previous record
    KeyChange(String),
}

impl core::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let code = match &self {
            VerificationError::AuthPath(err) => format!("(Authentication path) - {err}"),
            VerificationError::Commitment(err) => format!("(Commitment) - {err}"),
            VerificationError::StrChain(err) => format!("(STR chain) - {err}"),
            VerificationError::LookupProof(err) => format!("(Lookup proof) - {err}"),
            VerificationError::KeyChange(err) => format!("(Key change) - {err}"),
        };
        write!(f, "Verification error {code}")
    }
}

// Re-export the necessary verification functions
pub use auth_path::{compute_root_hash, verify_auth_path};
pub use commitment::{verify_commitment_signature, verify_str_link};
pub use lookup::{lookup_verify, verify_key_change, verify_key_data};
