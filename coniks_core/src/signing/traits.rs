// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module implements traits for managing the directory's signing key,
//! mainly pertaining to storage of the private key

use super::SigningError;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};

/// Represents a secure storage of the server's signing key. Every signed tree
/// root is signed with this key and clients pin the matching public key, so
/// it should not change for the life of the directory.
///
/// It is highly recommended to back this implementation with a static cache
/// of the private key bytes which lives for the life of the process.
/// I.e. retrieve the byte vector 1 time, and simply keep serving it up without
/// doing network access calls
#[async_trait]
pub trait SigningKeyStorage: Clone + Sync + Send {
    /* ======= To be implemented ====== */

    /// Retrieve the ed25519 private key as a vector of bytes
    async fn retrieve(&self) -> Result<Vec<u8>, SigningError>;

    /* ======= Common trait functionality ====== */

    /// Retrieve the properly constructed signing key
    async fn get_signing_key(&self) -> Result<SigningKey, SigningError> {
        let bytes = self.retrieve().await?;
        let secret: [u8; SECRET_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            SigningError::InvalidKey(format!(
                "Expected a {} byte signing key but got {} bytes",
                SECRET_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(SigningKey::from_bytes(&secret))
    }

    /// Retrieve the public key clients verify signed tree roots with
    async fn get_public_key(&self) -> Result<VerifyingKey, SigningError> {
        self.get_signing_key().await.map(|key| key.verifying_key())
    }

    /// Sign a message with the directory's key
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let key = self.get_signing_key().await?;
        Ok(key.sign(message).to_bytes().to_vec())
    }
}
