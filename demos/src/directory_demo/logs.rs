// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::OnceCell;
use tokio::time::{Duration, Instant};

use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

static EPOCH: OnceCell<Instant> = OnceCell::new();

pub(crate) struct ConsoleLogger {
    pub(crate) level: Level,
}

impl ConsoleLogger {
    pub(crate) fn touch() {
        EPOCH.get_or_init(Instant::now);
    }

    pub(crate) fn format_log_record(io: &mut (dyn Write + Send), record: &Record, no_color: bool) {
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
            "[{:02}:{:02}:{:02}.{:03}] ({:x}) {:6} {}{}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60,
            toc.subsec_millis(),
            thread_id::get(),
            record.level(),
            record.args(),
            target
        );
        if no_color {
            let _ = writeln!(io, "{msg}");
        } else {
            let msg = match record.level() {
                Level::Trace | Level::Debug => msg.white(),
                Level::Info => msg.blue(),
                Level::Warn => msg.yellow(),
                Level::Error => msg.red(),
            };
            let _ = writeln!(io, "{msg}");
        }
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            ConsoleLogger::format_log_record(&mut std::io::stdout(), record, false);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Writes every record the global level lets through, uncolored
pub(crate) struct FileLogger {
    sink: Mutex<File>,
}

impl FileLogger {
    pub(crate) fn new<T: AsRef<Path>>(path: T) -> io::Result<Self> {
        Ok(Self {
            sink: Mutex::new(File::create(path)?),
        })
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // a poisoned sink only loses log lines
        if let Ok(mut sink) = self.sink.lock() {
            ConsoleLogger::format_log_record(&mut *sink, record, true);
        }
    }

    fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.flush();
        }
    }
}
