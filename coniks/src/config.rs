// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Runtime configuration of a directory

use std::time::Duration;

/// Default time between epochs
pub const DEFAULT_EPOCH_INTERVAL_MS: u64 = 60_000;
/// Default bound on signing a tree root
pub const DEFAULT_SIGNING_TIMEOUT_MS: u64 = 10_000;

/// Configuration of a [crate::Directory]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde_serialization",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct DirectoryConfig {
    /// Minimum spacing between consecutive epochs, in milliseconds
    pub epoch_interval_ms: u64,
    /// How long signing a tree root may take before the epoch advance fails
    pub signing_timeout_ms: u64,
    /// A name for this directory, used in logs
    pub server_name: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            epoch_interval_ms: DEFAULT_EPOCH_INTERVAL_MS,
            signing_timeout_ms: DEFAULT_SIGNING_TIMEOUT_MS,
            server_name: "coniks".to_string(),
        }
    }
}

impl DirectoryConfig {
    /// A default configuration with the given epoch interval
    pub fn with_epoch_interval(epoch_interval_ms: u64) -> Self {
        Self {
            epoch_interval_ms,
            ..Default::default()
        }
    }

    /// The epoch interval as a [Duration]
    pub fn epoch_interval(&self) -> Duration {
        Duration::from_millis(self.epoch_interval_ms)
    }

    /// The signing timeout as a [Duration]
    pub fn signing_timeout(&self) -> Duration {
        Duration::from_millis(self.signing_timeout_ms)
    }

    /// Reject configurations the epoch builder cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.epoch_interval_ms == 0 {
            return Err("The epoch interval must be at least 1 ms".to_string());
        }
        if self.signing_timeout_ms == 0 {
            return Err("The signing timeout must be at least 1 ms".to_string());
        }
        Ok(())
    }
}
