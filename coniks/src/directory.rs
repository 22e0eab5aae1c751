// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Implementation of a key transparency directory

use crate::config::DirectoryConfig;
use crate::epoch::{Clock, EpochState};
use crate::errors::{ConiksError, DirectoryError, EpochError};
use crate::helper_structs::{EpochHash, KeyChangeRequest, PendingResponse, Registration};
use crate::history::{SignedTreeRoot, StrHistory};
use crate::pending::{PendingEntry, PendingQueue};
use crate::prefix_tree::{build_next_tree, InsertStats, RootNode};

use coniks_core::signing::{parse_public_key, SigningKeyStorage, VerifyingKey};
use coniks_core::{AuthPath, KeyData};

use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// The representation of a key transparency directory.
///
/// Requests are queued and become visible once [Directory::advance_epoch]
/// publishes the next signed tree root. Clones share the same state.
#[derive(Clone)]
pub struct Directory<S, C> {
    config: DirectoryConfig,
    signer: S,
    clock: C,
    /// Published roots. Readers clone the head and release; an epoch advance
    /// takes the write lock only to install the new head.
    history: Arc<RwLock<StrHistory>>,
    /// Operations awaiting the next epoch. Never held together with `history`
    /// by an epoch advance; intake takes `pending` first when it needs both.
    pending: Arc<Mutex<PendingQueue>>,
    /// Serializes epoch advances
    build_lock: Arc<Mutex<()>>,
    state: Arc<RwLock<EpochState>>,
}

impl<S: SigningKeyStorage, C: Clock> Directory<S, C> {
    /// Creates a new directory holding an empty tree, signed at the clock's
    /// current time as the first root of the history.
    pub async fn new(config: DirectoryConfig, signer: S, clock: C) -> Result<Self, ConiksError> {
        config.validate().map_err(ConiksError::Config)?;

        let epoch = clock.now_millis();
        let root = Arc::new(RootNode::empty(epoch)?);
        let first = tokio::time::timeout(
            config.signing_timeout(),
            SignedTreeRoot::sign(root, None, &signer),
        )
        .await
        .map_err(|_| EpochError::SigningTimeout(epoch))??;
        info!(
            "Directory {} started at epoch {} with root hash {}",
            config.server_name,
            epoch,
            hex::encode(first.root_hash())
        );

        let history = StrHistory::init(first, config.epoch_interval_ms);
        Ok(Self {
            config,
            signer,
            clock,
            history: Arc::new(RwLock::new(history)),
            pending: Arc::new(Mutex::new(PendingQueue::new())),
            build_lock: Arc::new(Mutex::new(())),
            state: Arc::new(RwLock::new(EpochState::Open)),
        })
    }

    /// The directory's configuration
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Queue the registration of a new name. The name is reserved from this
    /// point on, so a second registration fails with [DirectoryError::NameExists]
    /// whether or not the first has been published yet.
    pub async fn submit_registration(
        &self,
        registration: Registration,
    ) -> Result<PendingResponse, DirectoryError> {
        check_request(
            &registration.username,
            &registration.key_data,
            registration.change_key.as_deref(),
            registration.allows_unsigned_key_change,
        )?;

        let mut pending = self.pending.lock().await;
        let next_epoch = {
            let history = self.history.read().await;
            if history
                .current()
                .root()
                .lookup(&registration.username)
                .is_some()
            {
                return Err(DirectoryError::NameExists(registration.username));
            }
            history.next_epoch()
        };
        let counter = pending.enqueue_registration(registration.to_leaf())?;
        let response = self.pending_response(next_epoch).await;
        drop(pending);

        debug!(
            "Queued registration of '{}' ({})",
            registration.username, counter
        );
        Ok(response)
    }

    /// Queue a change to an existing name. Names whose registration has not
    /// yet been published are [DirectoryError::NameNotFound]. The change is
    /// authorized against the published record here, and again against the
    /// record as it stands when the epoch applies it.
    pub async fn submit_key_change(
        &self,
        request: KeyChangeRequest,
        signature: Option<Vec<u8>>,
    ) -> Result<PendingResponse, DirectoryError> {
        check_request(
            &request.username,
            &request.key_data,
            request.change_key.as_deref(),
            request.allows_unsigned_key_change,
        )?;

        let mut pending = self.pending.lock().await;
        let (head, next_epoch) = {
            let history = self.history.read().await;
            (history.current(), history.next_epoch())
        };
        let record = head
            .root()
            .lookup(&request.username)
            .ok_or_else(|| DirectoryError::NameNotFound(request.username.clone()))?;
        let change = request.to_key_change(signature);
        change.authorize(record)?;

        let counter = pending.enqueue_key_change(&request.username, change);
        let response = self.pending_response(next_epoch).await;
        drop(pending);

        debug!("Queued key change for '{}' ({})", request.username, counter);
        Ok(response)
    }

    // Callers hold the pending lock, so the state read here agrees with the
    // history they read and with the batch their entry joins.
    async fn pending_response(&self, next_epoch: u64) -> PendingResponse {
        // a running build publishes an earlier drain, so this one waits an extra interval
        let expected_epoch = match *self.state.read().await {
            EpochState::Open => next_epoch,
            EpochState::Building => next_epoch.saturating_add(self.config.epoch_interval_ms),
        };
        PendingResponse {
            expected_epoch,
            epoch_interval_ms: self.config.epoch_interval_ms,
        }
    }

    /// The signed tree root in force at `epoch`: the most recent one at or
    /// before it. Epochs past the current one get the current root.
    /// Epochs before the first root are [DirectoryError::EpochNotPublished].
    pub async fn get_commitment(&self, epoch: u64) -> Result<Arc<SignedTreeRoot>, ConiksError> {
        let history = self.history.read().await;
        if epoch < history.first_epoch() {
            return Err(DirectoryError::EpochNotPublished(epoch).into());
        }
        Ok(history.get(epoch)?)
    }

    /// The authentication path for `username` in the tree in force at `epoch`,
    /// with the epoch and root hash it proves against.
    pub async fn lookup(
        &self,
        username: &str,
        epoch: u64,
    ) -> Result<(AuthPath, EpochHash), ConiksError> {
        let signed = self.get_commitment(epoch).await?;
        let path = signed
            .root()
            .get_auth_path(username)?
            .ok_or_else(|| DirectoryError::NameNotFound(username.to_string()))?;
        Ok((path, EpochHash(signed.epoch(), signed.root_hash())))
    }

    /// Publish the next epoch from every queued operation.
    ///
    /// On failure the drained operations are queued again and the published
    /// history is unchanged.
    pub async fn advance_epoch(&self) -> Result<EpochHash, ConiksError> {
        let _build = self.build_lock.lock().await;

        // the state flips with the drain and the install, under the pending
        // lock, so intake never sees one without the other
        let entries = {
            let mut pending = self.pending.lock().await;
            *self.state.write().await = EpochState::Building;
            pending.drain()
        };

        let signed = self.sign_batch(&entries).await;
        let mut pending = self.pending.lock().await;
        let result = match signed {
            Ok(next) => self.install(next).await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(_) => pending.complete(),
            Err(err) => {
                error!(
                    "Epoch advance failed, re-queueing {} operations: {}",
                    entries.len(),
                    err
                );
                pending.restore(entries);
            }
        }
        *self.state.write().await = EpochState::Open;
        drop(pending);

        result
    }

    /// Build and sign the next root without touching the published history
    async fn sign_batch(
        &self,
        entries: &[PendingEntry],
    ) -> Result<(SignedTreeRoot, InsertStats), ConiksError> {
        let (head, earliest) = {
            let history = self.history.read().await;
            (history.current(), history.next_epoch())
        };
        let epoch = self.clock.now_millis().max(earliest);

        let (root, stats) = build_next_tree(head.root(), entries, epoch)?;
        let next = tokio::time::timeout(
            self.config.signing_timeout(),
            SignedTreeRoot::sign(Arc::new(root), Some(head), &self.signer),
        )
        .await
        .map_err(|_| EpochError::SigningTimeout(epoch))??;
        Ok((next, stats))
    }

    async fn install(
        &self,
        (next, stats): (SignedTreeRoot, InsertStats),
    ) -> Result<EpochHash, ConiksError> {
        let installed = self.history.write().await.advance(next)?;
        info!(
            "Published epoch {} of {} ({} registered, {} changed, {} rejected) with root hash {}",
            installed.epoch(),
            self.config.server_name,
            stats.leaves_inserted,
            stats.leaves_changed,
            stats.changes_rejected,
            hex::encode(installed.root_hash())
        );
        Ok(EpochHash(installed.epoch(), installed.root_hash()))
    }

    /// The epoch of the newest published root
    pub async fn current_epoch(&self) -> u64 {
        self.history.read().await.current_epoch()
    }

    /// Whether an epoch advance is underway
    pub async fn epoch_state(&self) -> EpochState {
        *self.state.read().await
    }

    /// Number of operations waiting for the next epoch
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// The key clients verify signed tree roots with
    pub async fn get_public_key(&self) -> Result<VerifyingKey, ConiksError> {
        Ok(self.signer.get_public_key().await?)
    }
}

/// Reject requests that could never be applied
fn check_request(
    username: &str,
    key_data: &KeyData,
    change_key: Option<&[u8]>,
    allows_unsigned_key_change: bool,
) -> Result<(), DirectoryError> {
    if username.is_empty() {
        return Err(DirectoryError::Malformed("Empty username".to_string()));
    }
    if key_data.is_empty() {
        return Err(DirectoryError::Malformed(format!(
            "Empty key data for '{username}'"
        )));
    }
    match change_key {
        Some(change_key) => {
            parse_public_key(change_key).map_err(|err| {
                DirectoryError::Malformed(format!("Bad change key for '{username}': {err}"))
            })?;
        }
        None if !allows_unsigned_key_change => {
            return Err(DirectoryError::Malformed(format!(
                "'{username}' requires signed key changes but has no change key"
            )));
        }
        None => {}
    }
    Ok(())
}
