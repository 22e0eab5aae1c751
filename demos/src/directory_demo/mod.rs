// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An example tool running an in-memory key directory, publishing an epoch
//! on a timer and taking commands from the console

use anyhow::Result;
use clap::{Parser, ValueEnum};
use coniks::{Directory, DirectoryConfig, EpochTimer, SystemClock};
use coniks_core::signing::HardCodedSigningKey;
use commands::Command;
use log::{error, info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{stdin, stdout, Write};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::*;
use tokio::time::timeout;

mod commands;
mod directory_host;
mod logs;

use logs::ConsoleLogger;

#[derive(ValueEnum, Clone, Debug)]
enum PublicLogLevels {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl PublicLogLevels {
    pub(crate) fn to_log_level(&self) -> log::Level {
        match &self {
            PublicLogLevels::Error => log::Level::Error,
            PublicLogLevels::Warn => log::Level::Warn,
            PublicLogLevels::Info => log::Level::Info,
            PublicLogLevels::Debug => log::Level::Debug,
            PublicLogLevels::Trace => log::Level::Trace,
        }
    }
}

/// Application modes
#[derive(Parser, Debug, Clone)]
enum OtherMode {
    #[clap(about = "Benchmark registration, publishing and verified lookups")]
    BenchRegister { num_users: u64 },
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct CliArgs {
    /// Activate debugging mode
    #[clap(long = "debug", short = 'd', name = "Enable debugging mode")]
    debug: bool,

    #[clap(
        value_enum,
        long = "log_level",
        short = 'l',
        name = "Adjust the console log-level (default = INFO)",
        ignore_case = true,
        default_value = "Info"
    )]
    console_debug: PublicLogLevels,

    /// Milliseconds between published epochs
    #[clap(long = "epoch_interval_ms", short = 'e', default_value = "10000")]
    epoch_interval_ms: u64,

    /// Milliseconds signing a tree root may take before the epoch fails
    #[clap(long = "signing_timeout_ms", default_value = "10000")]
    signing_timeout_ms: u64,

    #[clap(subcommand)]
    other_mode: Option<OtherMode>,
}

// MAIN //
pub(crate) async fn render_cli(args: CliArgs) -> Result<()> {
    ConsoleLogger::touch();

    let cli = args;

    // Initialize logging facades
    let mut loggers: Vec<Box<dyn log::Log>> = vec![Box::new(ConsoleLogger {
        level: cli.console_debug.to_log_level(),
    })];

    let level = if cli.debug {
        // File-logging enabled in debug mode
        match logs::FileLogger::new("coniks_app.log") {
            Err(err) => println!("Error initializing file logger {err}"),
            Ok(flogger) => loggers.push(Box::new(flogger)),
        }
        log::Level::Debug
    } else {
        cli.console_debug.to_log_level()
    };

    if let Err(err) = multi_log::MultiLogger::init(loggers, level) {
        println!("Error initializing multi-logger {err}");
    }

    let config = DirectoryConfig {
        epoch_interval_ms: cli.epoch_interval_ms,
        signing_timeout_ms: cli.signing_timeout_ms,
        server_name: "coniks-demo".to_string(),
    };
    let directory = Directory::new(config, HardCodedSigningKey, SystemClock).await?;

    let (tx, mut rx) = channel(2);
    let host_directory = directory.clone();
    let host =
        tokio::spawn(async move { directory_host::init_host(&mut rx, &host_directory).await });

    if let Some(OtherMode::BenchRegister { num_users }) = &cli.other_mode {
        bench_register(&tx, *num_users).await;
    } else {
        let timer = EpochTimer::spawn(directory);
        process_input(&cli, &tx).await;
        if let Err(err) = timer.shutdown().await {
            error!("Epoch timer stopped with an error: {}", err);
        }
    }

    // terminate the server proc
    if tx
        .send(directory_host::Rpc(
            directory_host::DirectoryCommand::Terminate,
            None,
        ))
        .await
        .is_err()
    {
        error!("Error shutting down directory");
    }
    host.await?;
    Ok(())
}

// Helpers //
async fn send_command(
    tx: &Sender<directory_host::Rpc>,
    command: directory_host::DirectoryCommand,
) -> std::result::Result<String, String> {
    let (rpc_tx, rpc_rx) = tokio::sync::oneshot::channel();
    tx.send(directory_host::Rpc(command, Some(rpc_tx)))
        .await
        .map_err(|_| "Error sending message to directory".to_string())?;
    rpc_rx
        .await
        .map_err(|err| format!("Failed to receive result from directory: {err}"))?
}

async fn bench_register(tx: &Sender<directory_host::Rpc>, num_users: u64) {
    println!("======= Benchmark operation requested ======= ");
    println!("Beginning REGISTER benchmark of {num_users} users");

    let users: Vec<(String, String)> = (1..=num_users)
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(i);
            let user = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            let key = rng.sample_iter(&Alphanumeric).take(64).map(char::from).collect();
            (user, key)
        })
        .collect();

    let tic = Instant::now();
    let queued = send_command(
        tx,
        directory_host::DirectoryCommand::RegisterBatch(users.clone()),
    )
    .await;
    let published = match queued {
        Ok(_) => send_command(tx, directory_host::DirectoryCommand::Publish).await,
        Err(err) => Err(err),
    };
    if let Err(err) = published {
        error!("Benchmark operation error {}", err);
        return;
    }
    let publish_time = tic.elapsed();

    let tic = Instant::now();
    for (user, _) in &users {
        let lookup = directory_host::DirectoryCommand::Lookup(user.clone(), None);
        if let Err(err) = send_command(tx, lookup).await {
            error!("Benchmark operation error {}", err);
            return;
        }
    }
    let lookup_time = tic.elapsed();

    println!(
        "Benchmark output: Registered and published {} users in {} ms\nLooked up and verified {} users in {} ms\nTime-per-lookup (avg): {} \u{00B5}s",
        num_users,
        publish_time.as_millis(),
        num_users,
        lookup_time.as_millis(),
        lookup_time.as_micros() / num_users.max(1) as u128
    );
}

async fn process_input(cli: &CliArgs, tx: &Sender<directory_host::Rpc>) {
    loop {
        println!("Please enter a command");
        print!("> ");
        if stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin().read_line(&mut line) {
            // end of input
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("Failed to read from stdin: {}", err);
                break;
            }
        }

        match Command::parse(&line) {
            Command::Unknown(other) => {
                println!("Input '{other}' is not supported, enter 'help' for the help menu")
            }
            Command::InvalidArgs(message) => println!("Invalid arguments: {message}"),
            Command::Exit => {
                info!("Exiting...");
                break;
            }
            Command::Help => {
                Command::print_help_menu();
            }
            Command::Info => {
                if cli.debug {
                    println!("\t**** DEBUG mode ACTIVE ****");
                }
                println!("===== Key Directory Information =====");
                println!("      In-memory directory, epoch every {} ms", cli.epoch_interval_ms);
                println!();
            }
            Command::Directory(cmd) => {
                let wait = if cli.debug {
                    Duration::MAX
                } else {
                    Duration::from_millis(cli.signing_timeout_ms + 1000)
                };
                match timeout(wait, send_command(tx, cmd)).await {
                    Ok(Ok(success)) => println!("Response: {success}"),
                    Ok(Err(dir_err)) => {
                        error!("Error in directory processing command: {}", dir_err)
                    }
                    Err(_) => warn!("Timeout waiting on receive from directory"),
                }
            }
        }
    }
}
