// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Contains the tests for the high-level API (directory, epochs, client verification)

mod test_core_protocol;

use crate::{Directory, DirectoryConfig, ManualClock};

use coniks_core::signing::{HardCodedSigningKey, SigningError, SigningKeyStorage};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A signer which can be made slow or broken after the directory is created
#[derive(Clone, Default)]
pub struct ControlledSigner {
    delay_ms: Arc<AtomicU64>,
    fail: Arc<AtomicBool>,
}

impl ControlledSigner {
    pub fn set_delay(&self, millis: u64) {
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SigningKeyStorage for ControlledSigner {
    async fn retrieve(&self) -> Result<Vec<u8>, SigningError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SigningError::GetKey("Key storage offline".to_string()));
        }
        HardCodedSigningKey.retrieve().await
    }
}

pub const INTERVAL: u64 = 100;

/// A directory starting at epoch 0 with a 100 ms interval, driven by a manual clock
pub async fn setup_directory(
) -> Result<(Directory<HardCodedSigningKey, ManualClock>, ManualClock), crate::ConiksError> {
    let clock = ManualClock::new(0);
    let directory = Directory::new(
        DirectoryConfig::with_epoch_interval(INTERVAL),
        HardCodedSigningKey,
        clock.clone(),
    )
    .await?;
    Ok((directory, clock))
}

/// Like [setup_directory], with a signer the test controls
pub async fn setup_controlled_directory(
    signing_timeout_ms: u64,
) -> Result<(Directory<ControlledSigner, ManualClock>, ControlledSigner), crate::ConiksError> {
    let signer = ControlledSigner::default();
    let config = DirectoryConfig {
        signing_timeout_ms,
        ..DirectoryConfig::with_epoch_interval(INTERVAL)
    };
    let directory = Directory::new(config, signer.clone(), ManualClock::new(0)).await?;
    Ok((directory, signer))
}
