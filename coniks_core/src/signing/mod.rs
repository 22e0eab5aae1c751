// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Ed25519 signing of tree roots and verification of signed key changes.
//! Keys and signatures travel as opaque byte strings in the public records.

mod traits;
pub use traits::SigningKeyStorage;

pub use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

use ed25519_dalek::{Signature, Verifier};

/// A signing key storage with a hard-coded private key, which should ONLY be
/// used in tests and demos
///
/// const KEY_MATERIAL: &str = "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";
#[derive(Clone)]
pub struct HardCodedSigningKey;

#[async_trait::async_trait]
impl SigningKeyStorage for HardCodedSigningKey {
    async fn retrieve(&self) -> Result<Vec<u8>, SigningError> {
        hex::decode("c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721")
            .map_err(|hex_err| SigningError::GetKey(hex_err.to_string()))
    }
}

/// Errors thrown from signing operations
#[derive(Debug, Eq, PartialEq)]
pub enum SigningError {
    /// The key storage failed to produce the key
    GetKey(String),
    /// Key bytes did not form a valid key
    InvalidKey(String),
    /// A signature was malformed or did not verify
    InvalidSignature(String),
}

impl core::fmt::Display for SigningError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let code = match &self {
            SigningError::GetKey(err) => format!("(Get key) - {err}"),
            SigningError::InvalidKey(err) => format!("(Invalid key) - {err}"),
            SigningError::InvalidSignature(err) => format!("(Invalid signature) - {err}"),
        };
        write!(f, "Signing error {code}")
    }
}

/// Parse a public key from its raw byte encoding
pub fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey, SigningError> {
    let raw: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
        SigningError::InvalidKey(format!(
            "Expected a {} byte public key but got {} bytes",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&raw).map_err(|err| SigningError::InvalidKey(err.to_string()))
}

/// Verify an ed25519 signature over `message` with the raw public key bytes
pub fn verify_signature(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), SigningError> {
    let key = parse_public_key(public_key)?;
    let signature = Signature::from_slice(signature)
        .map_err(|err| SigningError::InvalidSignature(err.to_string()))?;
    key.verify(message, &signature)
        .map_err(|err| SigningError::InvalidSignature(err.to_string()))
}
