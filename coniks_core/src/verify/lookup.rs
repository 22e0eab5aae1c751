// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Verification of lookup results and of the key changes between them

use super::commitment::verify_commitment_signature;
use super::{auth_path::verify_auth_path, VerificationError};

use crate::crypto::key_change_message_bytes;
use crate::signing::verify_signature;
use crate::{AuthPath, Commitment, KeyData, UserLeafNode};

/// Verifies a lookup with respect to a signed tree root: the root must carry
/// a valid server signature, the proof must be for `username`, and its path
/// must hash up to the committed root. Returns the proven record.
pub fn lookup_verify(
    server_public_key: &[u8],
    commitment: &Commitment,
    username: &str,
    proof: AuthPath,
) -> Result<UserLeafNode, VerificationError> {
    verify_commitment_signature(server_public_key, commitment)?;

    if proof.leaf.username != username {
        return Err(VerificationError::LookupProof(format!(
            "Proof is for '{}' but '{}' was looked up",
            proof.leaf.username, username
        )));
    }
    if proof.leaf.epoch_added > commitment.epoch || proof.leaf.epoch_changed > commitment.epoch {
        return Err(VerificationError::LookupProof(format!(
            "Record for '{}' is dated after the committed epoch {}",
            username, commitment.epoch
        )));
    }

    verify_auth_path(&commitment.root_hash, &proof)?;
    Ok(proof.leaf)
}

/// Check that a proven record binds the key data the client expects
pub fn verify_key_data(leaf: &UserLeafNode, expected: &KeyData) -> Result<(), VerificationError> {
    if &leaf.key_data != expected {
        return Err(VerificationError::LookupProof(format!(
            "Record for '{}' binds {} instead of the expected {}",
            leaf.username,
            hex::encode(&leaf.key_data.0),
            hex::encode(&expected.0)
        )));
    }
    Ok(())
}

/// Check that `current` is a legitimate successor of `previous`, two proven
/// records of the same user from different epochs. A changed record must
/// carry the change message for its current fields, and when `previous`
/// required signed changes, a valid signature under `previous`'s change key.
pub fn verify_key_change(
    previous: &UserLeafNode,
    current: &UserLeafNode,
) -> Result<(), VerificationError> {
    if previous.username != current.username
        || previous.index != current.index
        || previous.epoch_added != current.epoch_added
    {
        return Err(VerificationError::KeyChange(format!(
            "Records for '{}' and '{}' do not describe the same registration",
            previous.username, current.username
        )));
    }
    if current.epoch_changed < previous.epoch_changed {
        return Err(VerificationError::KeyChange(format!(
            "Record for '{}' moved back in time from epoch {} to {}",
            current.username, previous.epoch_changed, current.epoch_changed
        )));
    }
    if current.epoch_changed == previous.epoch_changed {
        if current != previous {
            return Err(VerificationError::KeyChange(format!(
                "Record for '{}' changed without a new change epoch",
                current.username
            )));
        }
        return Ok(());
    }

    let expected_message = key_change_message_bytes(
        &current.username,
        &current.key_data,
        current.change_key.as_deref(),
        current.allows_unsigned_key_change,
        current.allows_public_lookup,
    );
    if current.last_change_message.as_deref() != Some(expected_message.as_slice()) {
        return Err(VerificationError::KeyChange(format!(
            "Change message for '{}' does not describe the current record",
            current.username
        )));
    }

    if !previous.allows_unsigned_key_change {
        let change_key = previous.change_key.as_deref().ok_or_else(|| {
            VerificationError::KeyChange(format!(
                "Record for '{}' requires signed changes but has no change key",
                previous.username
            ))
        })?;
        let signature = current.last_change_signature.as_deref().ok_or_else(|| {
            VerificationError::KeyChange(format!(
                "Unsigned change applied to '{}' which requires signed changes",
                current.username
            ))
        })?;
        verify_signature(change_key, &expected_message, signature).map_err(|err| {
            VerificationError::KeyChange(format!(
                "Change signature for '{}' did not verify: {}",
                current.username, err
            ))
        })?;
    }
    Ok(())
}
