// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

use coniks::epoch::Clock;
use coniks::{Directory, EpochHash, KeyChangeRequest, KeyData, Registration};
use coniks_core::signing::SigningKeyStorage;
use coniks_core::verify::lookup_verify;
use log::{error, info};
use tokio::sync::mpsc::*;
use tokio::time::Instant;

pub(crate) struct Rpc(
    pub(crate) DirectoryCommand,
    pub(crate) Option<tokio::sync::oneshot::Sender<Result<String, String>>>,
);

#[derive(Debug, PartialEq, Eq)]
pub enum DirectoryCommand {
    Register(String, String),
    RegisterBatch(Vec<(String, String)>),
    Change(String, String),
    Lookup(String, Option<u64>),
    Commitment(Option<u64>),
    Epoch,
    Publish,
    Terminate,
}

pub(crate) async fn init_host<S, C>(rx: &mut Receiver<Rpc>, directory: &Directory<S, C>)
where
    S: SigningKeyStorage,
    C: Clock,
{
    info!("Starting the key directory host");

    while let Some(Rpc(message, channel)) = rx.recv().await {
        match (message, channel) {
            (DirectoryCommand::Terminate, _) => break,
            (message, Some(response)) => {
                let result = handle(message, directory).await;
                if response.send(result).is_err() {
                    error!("The requester dropped its response channel");
                }
            }
            (_, None) => {
                error!("A channel was not provided to the directory server to process a command!");
            }
        }
    }

    info!("Key directory host shutting down");
}

async fn handle<S, C>(message: DirectoryCommand, directory: &Directory<S, C>) -> Result<String, String>
where
    S: SigningKeyStorage,
    C: Clock,
{
    match message {
        DirectoryCommand::Register(user, key) => directory
            .submit_registration(Registration::new(&user, KeyData::from(&key)))
            .await
            .map(|pending| {
                format!(
                    "QUEUED registration of '{}', expected in epoch {}",
                    user, pending.expected_epoch
                )
            })
            .map_err(|error| format!("Failed to register with error: {error}")),
        DirectoryCommand::RegisterBatch(batch) => {
            let len = batch.len();
            for (user, key) in batch {
                directory
                    .submit_registration(Registration::new(&user, KeyData::from(&key)))
                    .await
                    .map_err(|error| format!("Failed to register '{user}' with error: {error}"))?;
            }
            Ok(format!("QUEUED {len} registrations"))
        }
        DirectoryCommand::Change(user, key) => directory
            .submit_key_change(KeyChangeRequest::new(&user, KeyData::from(&key)), None)
            .await
            .map(|pending| {
                format!(
                    "QUEUED key change for '{}', expected in epoch {}",
                    user, pending.expected_epoch
                )
            })
            .map_err(|error| format!("Failed to change key with error: {error}")),
        DirectoryCommand::Lookup(user, epoch) => lookup(directory, &user, epoch).await,
        DirectoryCommand::Commitment(epoch) => {
            let signed = directory
                .get_commitment(epoch.unwrap_or(u64::MAX))
                .await
                .map_err(|error| format!("Failed to retrieve commitment with error: {error}"))?;
            Ok(format!(
                "Epoch {} (previous {}), root hash {}, previous root {}",
                signed.epoch(),
                signed.prev_epoch(),
                hex::encode(signed.root_hash()),
                hex::encode(signed.prev_str_hash())
            ))
        }
        DirectoryCommand::Epoch => Ok(format!(
            "Current epoch {} ({:?}), {} operations pending",
            directory.current_epoch().await,
            directory.epoch_state().await,
            directory.pending_len().await
        )),
        DirectoryCommand::Publish => {
            let tic = Instant::now();
            let EpochHash(epoch, hash) = directory
                .advance_epoch()
                .await
                .map_err(|error| format!("Failed to publish with error: {error}"))?;
            Ok(format!(
                "PUBLISHED epoch {} in {} s (root hash: {})",
                epoch,
                tic.elapsed().as_secs_f64(),
                hex::encode(hash)
            ))
        }
        DirectoryCommand::Terminate => Err("The directory host is shutting down".to_string()),
    }
}

/// Look `user` up and check the proof the way a client would
async fn lookup<S, C>(directory: &Directory<S, C>, user: &str, epoch: Option<u64>) -> Result<String, String>
where
    S: SigningKeyStorage,
    C: Clock,
{
    let epoch = epoch.unwrap_or(u64::MAX);
    let (path, EpochHash(proved_epoch, _)) = directory
        .lookup(user, epoch)
        .await
        .map_err(|error| format!("Failed to lookup with error: {error}"))?;
    let commitment = directory
        .get_commitment(proved_epoch)
        .await
        .map_err(|error| format!("Failed to retrieve commitment with error: {error}"))?
        .to_commitment();
    let public_key = directory
        .get_public_key()
        .await
        .map_err(|error| format!("Failed to retrieve the public key with error: {error}"))?;

    match lookup_verify(public_key.as_bytes(), &commitment, user, path) {
        Ok(leaf) => Ok(format!(
            "Lookup proof verified for '{}' at epoch {}: key '{}' (added {}, changed {})",
            user,
            proved_epoch,
            String::from_utf8_lossy(&leaf.key_data),
            leaf.epoch_added,
            leaf.epoch_changed
        )),
        Err(error) => Err(format!(
            "WARN: Lookup proof failed verification for '{user}': {error}"
        )),
    }
}
