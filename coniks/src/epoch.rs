// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Epoch timing: the builder state, the clock epochs are read from, and the
//! background task which advances the directory once per interval.

use crate::directory::Directory;
use crate::errors::{ConiksError, EpochError};

use coniks_core::signing::SigningKeyStorage;

use log::{error, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Whether an epoch advance is underway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    /// Accepting requests, no build running
    Open,
    /// A batch has been drained and the next tree is being built and signed
    Building,
}

/// The source of epoch numbers, in milliseconds
pub trait Clock: Clone + Send + Sync + 'static {
    /// The current time in milliseconds
    fn now_millis(&self) -> u64;
}

/// Milliseconds since the UNIX epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            // a clock set before 1970 reads as 0; epochs still advance by the interval
            .unwrap_or(0)
    }
}

/// A clock which only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    /// A clock reading `millis`
    pub fn new(millis: u64) -> Self {
        Self(Arc::new(AtomicU64::new(millis)))
    }

    /// Set the time
    pub fn set(&self, millis: u64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    /// Move the time forward
    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// A background task calling [Directory::advance_epoch] once per epoch
/// interval. The first advance happens one interval after spawning. A failed
/// advance ends the task and its error is returned from [EpochTimer::shutdown].
pub struct EpochTimer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ConiksError>>,
}

impl EpochTimer {
    /// Start advancing `directory` on its configured interval
    pub fn spawn<S, C>(directory: Directory<S, C>) -> Self
    where
        S: SigningKeyStorage + 'static,
        C: Clock,
    {
        let (tx, mut rx) = oneshot::channel();
        let period = directory.config().epoch_interval();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut rx => {
                        info!("Epoch timer for {} stopped", directory.config().server_name);
                        return Ok(());
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = directory.advance_epoch().await {
                            error!("Epoch timer stopping after a failed advance: {}", err);
                            return Err(err);
                        }
                    }
                }
            }
        });
        Self {
            shutdown: Some(tx),
            handle,
        }
    }

    /// Whether the task has exited, either stopped or after a failure
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the timer and wait for it. An advance already running finishes first.
    pub async fn shutdown(mut self) -> Result<(), ConiksError> {
        if let Some(tx) = self.shutdown.take() {
            // the task may already have exited on an error, dropping the receiver
            let _ = tx.send(());
        }
        self.handle
            .await
            .map_err(|join_err| EpochError::TimerTask(join_err.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(150, other.now_millis());
        other.set(7);
        assert_eq!(7, clock.now_millis());
    }

    #[test]
    fn test_system_clock_is_past_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
