// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The queue of accepted operations awaiting the next epoch.
//!
//! Operations are ordered by the leading 24 bits of their lookup index, then
//! key changes before registrations, then by arrival. The arrival counter is
//! strictly increasing, so two key changes to the same user apply in the
//! order they were accepted.

use crate::errors::DirectoryError;

use coniks_core::signing::verify_signature;
use coniks_core::{KeyData, LookupIndex, UserLeafNode};

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// A requested change to a user's record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// The new key data
    pub key_data: KeyData,
    /// The new change key
    pub change_key: Option<Vec<u8>>,
    /// The new unsigned-change policy
    pub allows_unsigned_key_change: bool,
    /// The new lookup visibility
    pub allows_public_lookup: bool,
    /// The canonical encoding of the change, covered by `signature`
    pub message: Vec<u8>,
    /// Signature by the record's current change key, if provided
    pub signature: Option<Vec<u8>>,
}

impl KeyChange {
    /// Check that this change may be applied to `record` as it currently stands.
    /// Records that disallow unsigned changes require a signature by their change
    /// key; a signature that is supplied anyway must also verify.
    pub fn authorize(&self, record: &UserLeafNode) -> Result<(), DirectoryError> {
        match (&self.signature, record.allows_unsigned_key_change) {
            (None, true) => Ok(()),
            (None, false) => Err(DirectoryError::InvalidSignature(format!(
                "'{}' requires key changes to be signed",
                record.username
            ))),
            (Some(signature), _) => {
                let change_key = record.change_key.as_deref().ok_or_else(|| {
                    DirectoryError::InvalidSignature(format!(
                        "'{}' has no change key to verify the signature with",
                        record.username
                    ))
                })?;
                verify_signature(change_key, &self.message, signature).map_err(|err| {
                    DirectoryError::InvalidSignature(format!(
                        "Change for '{}' failed verification: {}",
                        record.username, err
                    ))
                })
            }
        }
    }

    /// Apply the change to `record`, stamping it with `epoch`
    pub(crate) fn apply(&self, record: &mut UserLeafNode, epoch: u64) {
        record.key_data = self.key_data.clone();
        record.change_key = self.change_key.clone();
        record.allows_unsigned_key_change = self.allows_unsigned_key_change;
        record.allows_public_lookup = self.allows_public_lookup;
        record.last_change_message = Some(self.message.clone());
        record.last_change_signature = self.signature.clone();
        record.epoch_changed = epoch;
    }
}

/// An accepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Publish a new record
    Register(UserLeafNode),
    /// Change an existing record
    KeyChange(KeyChange),
}

impl Operation {
    /// Key changes sort ahead of registrations sharing an index prefix
    fn rank(&self) -> u8 {
        match self {
            Operation::KeyChange(_) => 0,
            Operation::Register(_) => 1,
        }
    }
}

/// An operation waiting for the next epoch
#[derive(Debug, Clone)]
pub struct PendingEntry {
    /// The user the operation targets
    pub username: String,
    /// The user's lookup index
    pub index: LookupIndex,
    /// The operation itself
    pub operation: Operation,
    /// Arrival order, unique within a queue
    pub counter: u64,
}

impl PendingEntry {
    /// The batch ordering key: (index prefix, operation rank, arrival)
    pub fn sort_key(&self) -> (u32, u8, u64) {
        (self.index.prefix24(), self.operation.rank(), self.counter)
    }
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for PendingEntry {}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// The pending operation queue. Registered names are reserved from the moment
/// they are queued until the epoch that publishes them completes, so a second
/// registration of the same name is rejected even while a build is running.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: BinaryHeap<Reverse<PendingEntry>>,
    next_counter: u64,
    queued_names: HashSet<String>,
    in_flight_names: HashSet<String>,
}

impl PendingQueue {
    /// An empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued operations, excluding any drained into a running build
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no operations are queued
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether a registration for `username` is queued or being built
    pub fn is_name_reserved(&self, username: &str) -> bool {
        self.queued_names.contains(username) || self.in_flight_names.contains(username)
    }

    /// Queue a registration, returning its counter
    pub fn enqueue_registration(&mut self, leaf: UserLeafNode) -> Result<u64, DirectoryError> {
        if self.is_name_reserved(&leaf.username) {
            return Err(DirectoryError::NameExists(leaf.username));
        }
        self.queued_names.insert(leaf.username.clone());
        Ok(self.push(leaf.username.clone(), leaf.index, Operation::Register(leaf)))
    }

    /// Queue a key change, returning its counter
    pub fn enqueue_key_change(&mut self, username: &str, change: KeyChange) -> u64 {
        self.push(
            username.to_string(),
            LookupIndex::for_username(username),
            Operation::KeyChange(change),
        )
    }

    fn push(&mut self, username: String, index: LookupIndex, operation: Operation) -> u64 {
        self.next_counter += 1;
        let counter = self.next_counter;
        self.heap.push(Reverse(PendingEntry {
            username,
            index,
            operation,
            counter,
        }));
        counter
    }

    /// Remove every queued operation, in application order. The registered
    /// names stay reserved until [PendingQueue::complete] or [PendingQueue::restore].
    pub fn drain(&mut self) -> Vec<PendingEntry> {
        let mut entries = Vec::with_capacity(self.heap.len());
        while let Some(Reverse(entry)) = self.heap.pop() {
            entries.push(entry);
        }
        self.in_flight_names.extend(self.queued_names.drain());
        entries
    }

    /// The drained batch has been published; its names now live in the tree
    pub fn complete(&mut self) {
        self.in_flight_names.clear();
    }

    /// The drained batch failed to publish; put it back for the next attempt
    pub fn restore(&mut self, entries: Vec<PendingEntry>) {
        self.queued_names.extend(self.in_flight_names.drain());
        for entry in entries {
            self.heap.push(Reverse(entry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str) -> UserLeafNode {
        UserLeafNode::new(name, KeyData::from("key"), None, true, true)
    }

    fn change(key: &str) -> KeyChange {
        KeyChange {
            key_data: KeyData::from(key),
            change_key: None,
            allows_unsigned_key_change: true,
            allows_public_lookup: true,
            message: vec![],
            signature: None,
        }
    }

    #[test]
    fn test_counter_strictly_increases() -> Result<(), DirectoryError> {
        let mut queue = PendingQueue::new();
        let a = queue.enqueue_registration(registration("a"))?;
        let b = queue.enqueue_key_change("a", change("k1"));
        let c = queue.enqueue_key_change("a", change("k2"));
        assert!(a < b && b < c);
        assert_eq!(3, queue.len());
        Ok(())
    }

    #[test]
    fn test_drain_is_in_application_order() -> Result<(), DirectoryError> {
        let mut queue = PendingQueue::new();
        for i in 0..50 {
            queue.enqueue_registration(registration(&format!("user{i}")))?;
            queue.enqueue_key_change(&format!("other{i}"), change("k"));
        }
        let drained = queue.drain();
        assert_eq!(100, drained.len());
        assert!(queue.is_empty());
        for pair in drained.windows(2) {
            assert!(pair[0].sort_key() < pair[1].sort_key());
        }
        Ok(())
    }

    #[test]
    fn test_key_changes_to_one_user_keep_arrival_order() {
        let mut queue = PendingQueue::new();
        queue.enqueue_key_change("alice", change("k2"));
        queue.enqueue_key_change("alice", change("k1"));
        let drained = queue.drain();
        let keys: Vec<_> = drained
            .iter()
            .map(|entry| match &entry.operation {
                Operation::KeyChange(change) => change.key_data.clone(),
                Operation::Register(_) => unreachable!(),
            })
            .collect();
        assert_eq!(vec![KeyData::from("k2"), KeyData::from("k1")], keys);
    }

    #[test]
    fn test_key_change_sorts_before_registration_with_same_prefix() {
        let index = LookupIndex::for_username("alice");
        let register = PendingEntry {
            username: "alice".to_string(),
            index,
            operation: Operation::Register(registration("alice")),
            counter: 1,
        };
        let key_change = PendingEntry {
            username: "alice".to_string(),
            index,
            operation: Operation::KeyChange(change("k")),
            counter: 2,
        };
        assert!(key_change < register);
    }

    #[test]
    fn test_names_stay_reserved_while_in_flight() -> Result<(), DirectoryError> {
        let mut queue = PendingQueue::new();
        queue.enqueue_registration(registration("alice"))?;
        assert_eq!(
            Err(DirectoryError::NameExists("alice".to_string())),
            queue.enqueue_registration(registration("alice"))
        );

        let drained = queue.drain();
        assert!(queue.is_name_reserved("alice"));
        assert!(queue.enqueue_registration(registration("alice")).is_err());

        // failed build puts everything back
        queue.restore(drained);
        assert_eq!(1, queue.len());
        assert!(queue.is_name_reserved("alice"));

        // successful build releases the reservation
        let _ = queue.drain();
        queue.complete();
        assert!(!queue.is_name_reserved("alice"));
        Ok(())
    }
}
