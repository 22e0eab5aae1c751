// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities: a console logger and fixtures for building trees

use crate::pending::{KeyChange, Operation, PendingEntry};

use coniks_core::crypto::key_change_message_bytes;
use coniks_core::{KeyData, LookupIndex, UserLeafNode};

use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::OnceCell;
use std::sync::Once;
use tokio::time::{Duration, Instant};

static EPOCH: OnceCell<Instant> = OnceCell::new();
static LOGGER: TestConsoleLogger = TestConsoleLogger {};
static INIT_ONCE: Once = Once::new();

pub(crate) struct TestConsoleLogger;

impl TestConsoleLogger {
    pub(crate) fn format_log_record(record: &Record) {
        let target = match (record.target().split(':').last(), record.line()) {
            (Some(target), Some(line)) => format!(" ({target}:{line})"),
            (Some(target), None) => format!(" ({target})"),
            _ => String::new(),
        };

        let toc = EPOCH
            .get()
            .map(|start| Instant::now() - *start)
            .unwrap_or(Duration::from_millis(0));
        let seconds = toc.as_secs();

        let msg = format!(
            "[{:02}:{:02}:{:02}.{:03}] {:6} {}{}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60,
            toc.subsec_millis(),
            record.level(),
            record.args(),
            target
        );
        let msg = match record.level() {
            Level::Trace | Level::Debug => msg.white(),
            Level::Info => msg.blue(),
            Level::Warn => msg.yellow(),
            Level::Error => msg.red(),
        };
        println!("{msg}");
    }
}

impl log::Log for TestConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            TestConsoleLogger::format_log_record(record);
        }
    }

    fn flush(&self) {}
}

/// Initialize the console logger for tests. Safe to call repeatedly; only the
/// first call's level applies.
pub(crate) fn init_logger(level: Level) {
    EPOCH.get_or_init(Instant::now);

    INIT_ONCE.call_once(|| {
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(level.to_level_filter()))
            .unwrap();
    });
}

#[ctor::ctor]
fn test_start() {
    init_logger(Level::Info);
}

/// A registration of `name` with permissive flags
pub(crate) fn registration_entry(name: &str, key: &str, counter: u64) -> PendingEntry {
    let leaf = UserLeafNode::new(name, KeyData::from(key), None, true, true);
    PendingEntry {
        username: name.to_string(),
        index: leaf.index,
        operation: Operation::Register(leaf),
        counter,
    }
}

/// A key change for `name`. Unsigned changes get their canonical message
/// filled in for `name`.
pub(crate) fn key_change_entry(name: &str, mut change: KeyChange, counter: u64) -> PendingEntry {
    if change.signature.is_none() {
        change.message = key_change_message_bytes(
            name,
            &change.key_data,
            change.change_key.as_deref(),
            change.allows_unsigned_key_change,
            change.allows_public_lookup,
        );
    }
    PendingEntry {
        username: name.to_string(),
        index: LookupIndex::for_username(name),
        operation: Operation::KeyChange(change),
        counter,
    }
}

/// Two usernames whose lookup indices agree on exactly their first `bits` bits
pub(crate) fn find_users_sharing_prefix(bits: usize) -> (String, String) {
    let first = "prefix-user-0".to_string();
    let index = LookupIndex::for_username(&first);
    let second = (1..)
        .map(|i| format!("prefix-user-{i}"))
        .find(|candidate| {
            let other = LookupIndex::for_username(candidate);
            (0..bits).all(|bit| index.get_bit_at(bit) == other.get_bit_at(bit))
                && index.get_bit_at(bits) != other.get_bit_at(bits)
        })
        .unwrap();
    (first, second)
}

impl KeyChange {
    /// An unsigned change to `key` which keeps the permissive flags
    pub(crate) fn unsigned(key: &str) -> Self {
        Self {
            key_data: KeyData::from(key),
            change_key: None,
            allows_unsigned_key_change: true,
            allows_public_lookup: true,
            message: vec![],
            signature: None,
        }
    }
}
