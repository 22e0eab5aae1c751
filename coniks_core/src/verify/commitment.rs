// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Verification of signed tree roots and of the hash chain linking them

use super::VerificationError;

use crate::signing::verify_signature;
use crate::Commitment;

/// Verify the server's signature on a signed tree root
pub fn verify_commitment_signature(
    server_public_key: &[u8],
    commitment: &Commitment,
) -> Result<(), VerificationError> {
    verify_signature(
        server_public_key,
        &commitment.to_signing_bytes(),
        &commitment.signature,
    )
    .map_err(|err| {
        VerificationError::Commitment(format!(
            "Signature on the root for epoch {} did not verify: {}",
            commitment.epoch, err
        ))
    })
}

/// Verify that `next` directly extends `prev` in the hash chain: it names
/// `prev`'s epoch and hash as its predecessor and comes strictly later
pub fn verify_str_link(prev: &Commitment, next: &Commitment) -> Result<(), VerificationError> {
    if next.epoch <= prev.epoch {
        return Err(VerificationError::StrChain(format!(
            "Epoch {} does not come after epoch {}",
            next.epoch, prev.epoch
        )));
    }
    if next.prev_epoch != prev.epoch {
        return Err(VerificationError::StrChain(format!(
            "Root for epoch {} names {} as its previous epoch, expected {}",
            next.epoch, next.prev_epoch, prev.epoch
        )));
    }
    if next.prev_str_hash != prev.hash() {
        return Err(VerificationError::StrChain(format!(
            "Root for epoch {} does not carry the hash of the root for epoch {}",
            next.epoch, prev.epoch
        )));
    }
    Ok(())
}
