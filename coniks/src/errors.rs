// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Errors for various data structure operations.
use core::fmt;

use coniks_core::signing::SigningError;
use coniks_core::LookupIndex;

/// Symbolizes a ConiksError, thrown by the directory.
#[derive(Debug)]
pub enum ConiksError {
    /// Error propagation
    Tree(TreeError),
    /// Error propagation
    History(HistoryError),
    /// Error propagation
    Directory(DirectoryError),
    /// Error propagation
    Signing(SigningError),
    /// Error propagation
    Epoch(EpochError),
    /// The directory configuration was rejected
    Config(String),
}

impl From<TreeError> for ConiksError {
    fn from(error: TreeError) -> Self {
        Self::Tree(error)
    }
}

impl From<HistoryError> for ConiksError {
    fn from(error: HistoryError) -> Self {
        Self::History(error)
    }
}

impl From<DirectoryError> for ConiksError {
    fn from(error: DirectoryError) -> Self {
        Self::Directory(error)
    }
}

impl From<SigningError> for ConiksError {
    fn from(error: SigningError) -> Self {
        Self::Signing(error)
    }
}

impl From<EpochError> for ConiksError {
    fn from(error: EpochError) -> Self {
        Self::Epoch(error)
    }
}

impl std::error::Error for ConiksError {}

impl fmt::Display for ConiksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "Tree error: {err}"),
            Self::History(err) => write!(f, "History error: {err}"),
            Self::Directory(err) => write!(f, "Directory error: {err}"),
            Self::Signing(err) => write!(f, "{err}"),
            Self::Epoch(err) => write!(f, "Epoch error: {err}"),
            Self::Config(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

/// Structural errors raised while building the next version of the prefix
/// tree. Any of these aborts the epoch advance.
#[derive(Debug, PartialEq, Eq)]
pub enum TreeError {
    /// A registration reached a leaf that already holds the same name.
    /// Intake rejects duplicates, so this is an invariant violation.
    DuplicateRegistration(String),
    /// A key change reached an empty slot: its user is not in the tree
    MissingLeaf(String),
    /// Two different names hashed to the same lookup index
    IndexCollision(String, String, LookupIndex),
    /// A hash was requested from a node whose cache had not been recomputed
    StaleHash(usize),
    /// The descent ran past the last bit of the lookup index
    DepthExceeded(LookupIndex),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration(name) => {
                write!(f, "Registration for '{name}' found the name already in the tree")
            }
            Self::MissingLeaf(name) => {
                write!(f, "Key change for '{name}' found no leaf for the name")
            }
            Self::IndexCollision(existing, new, index) => {
                write!(
                    f,
                    "Names '{existing}' and '{new}' share the lookup index {index}"
                )
            }
            Self::StaleHash(depth) => {
                write!(f, "Node at depth {depth} has a stale hash cache")
            }
            Self::DepthExceeded(index) => {
                write!(f, "Descent for index {index} ran past the maximum depth")
            }
        }
    }
}

/// Errors thrown by the signed tree root history
#[derive(Debug, PartialEq, Eq)]
pub enum HistoryError {
    /// The new root's epoch is earlier than the current epoch plus the interval
    EpochTooEarly {
        /// The epoch of the current head
        current: u64,
        /// The epoch of the rejected root
        attempted: u64,
        /// The configured epoch interval
        interval: u64,
    },
    /// The new root does not name the current head as its predecessor
    BrokenLink(u64),
    /// No root at or before the requested epoch exists
    ChainExhausted(u64),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EpochTooEarly {
                current,
                attempted,
                interval,
            } => {
                write!(
                    f,
                    "Epoch {attempted} is earlier than the current epoch {current} plus the interval {interval}"
                )
            }
            Self::BrokenLink(epoch) => {
                write!(
                    f,
                    "Root for epoch {epoch} does not link to the current head"
                )
            }
            Self::ChainExhausted(epoch) => {
                write!(f, "No signed tree root exists at or before epoch {epoch}")
            }
        }
    }
}

/// Per-request errors returned to clients by the directory
#[derive(Debug, PartialEq, Eq)]
pub enum DirectoryError {
    /// The request is missing required fields or is internally inconsistent
    Malformed(String),
    /// The name is already registered, or has a registration pending
    NameExists(String),
    /// The name is not present
    NameNotFound(String),
    /// A signed key change was required but was absent or did not verify
    InvalidSignature(String),
    /// The requested epoch is earlier than the directory's first signed root
    EpochNotPublished(u64),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "Malformed request: {msg}"),
            Self::NameExists(name) => write!(f, "The name '{name}' is already registered"),
            Self::NameNotFound(name) => write!(f, "The name '{name}' was not found"),
            Self::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            Self::EpochNotPublished(epoch) => {
                write!(f, "No signed tree root was published by epoch {epoch}")
            }
        }
    }
}

/// Errors from running the epoch builder
#[derive(Debug, PartialEq, Eq)]
pub enum EpochError {
    /// Signing the next root did not finish within the configured timeout
    SigningTimeout(u64),
    /// The background epoch task panicked or was cancelled
    TimerTask(String),
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigningTimeout(epoch) => {
                write!(f, "Signing the root for epoch {epoch} timed out")
            }
            Self::TimerTask(msg) => write!(f, "Epoch timer task failed: {msg}"),
        }
    }
}
