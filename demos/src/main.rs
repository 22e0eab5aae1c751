// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Example applications for the coniks directory

mod directory_demo;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Coniks examples
#[derive(Parser, Debug)]
#[clap(author, about, long_about = None)]
pub struct Arguments {
    /// The type of example to run
    #[clap(subcommand)]
    example: ExampleType,
}

#[derive(Subcommand, Debug, Clone)]
enum ExampleType {
    /// In-memory directory with an epoch timer and a command prompt
    Directory(directory_demo::CliArgs),
}

// MAIN //
#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();

    match args.example {
        ExampleType::Directory(args) => directory_demo::render_cli(args).await?,
    }

    Ok(())
}
