// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Contains the tests for the main protocol (register, change, publish, lookup)
//! checked end to end with the client-side verification

use coniks_core::hash::{empty_child_hash, hash_children};
use coniks_core::signing::{SigningKey, SigningKeyStorage};
use coniks_core::verify::{
    lookup_verify, verify_commitment_signature, verify_key_change, verify_key_data,
    verify_str_link,
};
use ed25519_dalek::Signer;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::tests::{setup_directory, INTERVAL};
use crate::{
    ConiksError, DirectoryError, EpochHash, EpochState, EpochTimer, KeyChangeRequest, KeyData,
    Registration,
};

// The first root commits to a tree with two empty children
#[tokio::test]
async fn test_empty_directory_root() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    let commitment = directory.get_commitment(0).await?.to_commitment();
    assert_eq!(
        hash_children(&empty_child_hash(), &empty_child_hash()),
        commitment.root_hash
    );
    assert_eq!(0, commitment.prev_epoch);

    let public_key = directory.get_public_key().await?;
    assert!(verify_commitment_signature(public_key.as_bytes(), &commitment).is_ok());
    assert_eq!(EpochState::Open, directory.epoch_state().await);
    Ok(())
}

// A registration built at epoch 100 is found by a lookup at 101 and proves
// against the root in force at 101
#[tokio::test]
async fn test_registration_is_published_next_epoch() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    let response = directory
        .submit_registration(Registration::new("alice", KeyData::from("PK1")))
        .await?;
    assert_eq!(100, response.expected_epoch);
    assert_eq!(INTERVAL, response.epoch_interval_ms);

    // queued but not yet visible
    assert!(matches!(
        directory.lookup("alice", 0).await,
        Err(ConiksError::Directory(DirectoryError::NameNotFound(_)))
    ));
    assert_eq!(1, directory.pending_len().await);

    let EpochHash(epoch, root_hash) = directory.advance_epoch().await?;
    assert_eq!(100, epoch);
    assert_eq!(0, directory.pending_len().await);

    let (path, EpochHash(proved_epoch, proved_hash)) = directory.lookup("alice", 101).await?;
    assert_eq!((100, root_hash), (proved_epoch, proved_hash));

    let commitment = directory.get_commitment(101).await?.to_commitment();
    let public_key = directory.get_public_key().await?;
    let leaf = lookup_verify(public_key.as_bytes(), &commitment, "alice", path)
        .expect("Lookup proof failed to verify");
    assert_eq!(100, leaf.epoch_added);
    assert_eq!(100, leaf.epoch_changed);
    assert!(verify_key_data(&leaf, &KeyData::from("PK1")).is_ok());
    Ok(())
}

// Two key changes queued in the same epoch apply in arrival order
#[tokio::test]
async fn test_later_key_change_wins() -> Result<(), ConiksError> {
    let (directory, clock) = setup_directory().await?;
    directory
        .submit_registration(Registration::new("alice", KeyData::from("PK1")))
        .await?;
    directory.advance_epoch().await?;

    directory
        .submit_key_change(KeyChangeRequest::new("alice", KeyData::from("PK2")), None)
        .await?;
    directory
        .submit_key_change(KeyChangeRequest::new("alice", KeyData::from("PK3")), None)
        .await?;

    // the clock is ahead of the minimum spacing, so it decides the epoch
    clock.set(250);
    let EpochHash(epoch, _) = directory.advance_epoch().await?;
    assert_eq!(250, epoch);

    let (path, _) = directory.lookup("alice", epoch).await?;
    assert_eq!(KeyData::from("PK3"), path.leaf.key_data);
    assert_eq!(100, path.leaf.epoch_added);
    assert_eq!(250, path.leaf.epoch_changed);

    // the previous epoch still serves the old binding
    let (old_path, _) = directory.lookup("alice", 249).await?;
    assert_eq!(KeyData::from("PK1"), old_path.leaf.key_data);
    assert_eq!(Ok(()), verify_key_change(&old_path.leaf, &path.leaf));
    Ok(())
}

// Requests for epochs past the current one are answered with the current root
#[tokio::test]
async fn test_future_commitment_is_clamped() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    directory.advance_epoch().await?;
    directory.advance_epoch().await?;
    let current = directory.get_commitment(u64::MAX).await?;
    assert_eq!(200, current.epoch());
    assert_eq!(directory.current_epoch().await, current.epoch());
    Ok(())
}

// Every user verifies at every epoch, and every root links to its predecessor
#[tokio::test]
async fn test_proofs_across_epochs() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    let public_key = directory.get_public_key().await?;

    let mut rng = StdRng::seed_from_u64(42);
    let mut names: Vec<String> = (0..60).map(|i| format!("user{i}")).collect();
    names.shuffle(&mut rng);

    let mut published: Vec<(u64, Vec<String>)> = vec![];
    for (round, batch) in names.chunks(15).enumerate() {
        for name in batch {
            directory
                .submit_registration(Registration::new(name, KeyData::from(name.as_str())))
                .await?;
        }
        // rotate one earlier user per round
        if let Some(earlier) = published.last().and_then(|(_, batch)| batch.first()) {
            let key = KeyData::from(format!("rotated-{round}").as_bytes().to_vec());
            directory
                .submit_key_change(KeyChangeRequest::new(earlier, key), None)
                .await?;
        }
        let EpochHash(epoch, _) = directory.advance_epoch().await?;
        published.push((epoch, batch.to_vec()));
    }

    let mut visible: Vec<&String> = vec![];
    for (epoch, batch) in &published {
        visible.extend(batch.iter());
        let commitment = directory.get_commitment(*epoch).await?.to_commitment();
        for name in &visible {
            let (path, _) = directory.lookup(name, *epoch).await?;
            let leaf = lookup_verify(public_key.as_bytes(), &commitment, name, path)
                .expect("Lookup proof failed to verify");
            assert!(leaf.epoch_added <= *epoch);
        }
    }

    let chain: Vec<_> = (0..=published.len() as u64)
        .map(|i| i * INTERVAL)
        .collect();
    for pair in chain.windows(2) {
        let prev = directory.get_commitment(pair[0]).await?.to_commitment();
        let next = directory.get_commitment(pair[1]).await?.to_commitment();
        assert_eq!(Ok(()), verify_str_link(&prev, &next));
    }
    Ok(())
}

// A strict record only changes with a signature from its change key
#[tokio::test]
async fn test_signed_key_change() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    let change_key = SigningKey::from_bytes(&[9u8; 32]);
    let registration = Registration {
        change_key: Some(change_key.verifying_key().to_bytes().to_vec()),
        allows_unsigned_key_change: false,
        ..Registration::new("bob", KeyData::from("PK1"))
    };
    directory.submit_registration(registration).await?;
    directory.advance_epoch().await?;

    let request = KeyChangeRequest {
        change_key: Some(change_key.verifying_key().to_bytes().to_vec()),
        allows_unsigned_key_change: false,
        ..KeyChangeRequest::new("bob", KeyData::from("PK2"))
    };
    assert!(matches!(
        directory.submit_key_change(request.clone(), None).await,
        Err(DirectoryError::InvalidSignature(_))
    ));

    let signature = change_key.sign(&request.to_message_bytes()).to_bytes().to_vec();
    directory
        .submit_key_change(request, Some(signature))
        .await?;
    directory.advance_epoch().await?;

    let (old, _) = directory.lookup("bob", 100).await?;
    let (new, _) = directory.lookup("bob", 200).await?;
    assert_eq!(KeyData::from("PK2"), new.leaf.key_data);
    assert!(new.leaf.last_change_signature.is_some());
    assert_eq!(Ok(()), verify_key_change(&old.leaf, &new.leaf));
    Ok(())
}

// The timer advances the directory on its own and stops cleanly
#[tokio::test]
async fn test_epoch_timer_advances() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    directory
        .submit_registration(Registration::new("alice", KeyData::from("PK1")))
        .await?;

    let timer = EpochTimer::spawn(directory.clone());
    let mut waited = 0;
    while directory.current_epoch().await == 0 && waited < 5_000 {
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        waited += 10;
    }
    timer.shutdown().await?;

    assert!(directory.current_epoch().await >= INTERVAL);
    assert!(directory.lookup("alice", u64::MAX).await.is_ok());
    Ok(())
}

// The public key used for verification is the one the signer holds
#[tokio::test]
async fn test_public_key_matches_signer() -> Result<(), ConiksError> {
    let (directory, _) = setup_directory().await?;
    let expected = coniks_core::signing::HardCodedSigningKey
        .get_public_key()
        .await?;
    assert_eq!(expected, directory.get_public_key().await?);
    Ok(())
}
