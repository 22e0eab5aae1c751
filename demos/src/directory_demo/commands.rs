// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

use colored::*;

use crate::directory_demo::directory_host::DirectoryCommand;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Exit,
    Info,
    Directory(DirectoryCommand),
    InvalidArgs(String),
    Unknown(String),
}

impl Command {
    pub(crate) fn parse(text: &str) -> Command {
        let parts: Vec<&str> = text.split_whitespace().collect();
        let command = parts.first().map(|head| head.to_lowercase()).unwrap_or_default();

        match command.as_ref() {
            "exit" | "x" => Command::Exit,
            "help" | "?" => Command::Help,
            "info" => Command::Info,
            cmd => Command::handle_dir_cmd(cmd, &parts, text.trim()),
        }
    }

    pub(crate) fn print_help_menu() {
        println!(
            "{}",
            "*************************** Help menu ***************************".red()
        );
        println!(
            "{} are commands, {} are mandatory args, {} are optional args",
            "green".green(),
            "blue".blue(),
            "magenta".magenta()
        );
        println!("=============================================================");
        println!("  {}|{}:\t\t\tprint this menu", "help".green(), "?".green());
        println!(
            "  {}|{}:\t\t\texit the application",
            "exit".green(),
            "x".green()
        );
        println!("  {}:\t\t\t\tprint information about the directory", "info".green());
        println!(
            "  {} {} {}:\t\tregister key data for a new user",
            "register".green(),
            "user".blue(),
            "key".blue()
        );
        println!(
            "  {} {} {}:\t\tchange the key data of a registered user",
            "change".green(),
            "user".blue(),
            "key".blue()
        );
        println!(
            "  {} {} {}:\t\tlookup and verify a proof for user (default = latest epoch)",
            "lookup".green(),
            "user".blue(),
            "epoch".magenta()
        );
        println!(
            "  {} {}:\t\tshow the signed tree root at epoch (default = latest epoch)",
            "commitment".green(),
            "epoch".magenta()
        );
        println!(
            "  {}:\t\t\t\tshow the current epoch and pending operations",
            "epoch".green()
        );
        println!(
            "  {}:\t\t\tpublish the next epoch now",
            "publish".green()
        );
    }

    // ==== Helpers for managing directory commands ==== //
    fn handle_dir_cmd(command: &str, parts: &[&str], full_text: &str) -> Command {
        let dir_cmd: Option<Option<DirectoryCommand>> = match command {
            "register" => Some(Command::user_and_key(parts).map(|(user, key)| {
                DirectoryCommand::Register(user, key)
            })),
            "change" => Some(
                Command::user_and_key(parts).map(|(user, key)| DirectoryCommand::Change(user, key)),
            ),
            "lookup" => Some(Command::lookup(parts)),
            "commitment" => Some(Command::optional_epoch(parts).map(DirectoryCommand::Commitment)),
            "epoch" => Some(Some(DirectoryCommand::Epoch)),
            "publish" => Some(Some(DirectoryCommand::Publish)),
            _ => None,
        };
        match dir_cmd {
            Some(Some(cmd)) => Command::Directory(cmd),
            Some(None) => {
                let msg = format!(
                    "Command {} received invalid arguments. Check {} for syntax",
                    command,
                    "help".green()
                );
                Command::InvalidArgs(msg)
            }
            None => Command::Unknown(String::from(full_text)),
        }
    }

    fn user_and_key(parts: &[&str]) -> Option<(String, String)> {
        match parts {
            [_, user, key] => Some((user.to_string(), key.to_string())),
            _ => None,
        }
    }

    fn lookup(parts: &[&str]) -> Option<DirectoryCommand> {
        match parts {
            [_, user] => Some(DirectoryCommand::Lookup(user.to_string(), None)),
            [_, user, epoch] => epoch
                .parse::<u64>()
                .ok()
                .map(|epoch| DirectoryCommand::Lookup(user.to_string(), Some(epoch))),
            _ => None,
        }
    }

    fn optional_epoch(parts: &[&str]) -> Option<Option<u64>> {
        match parts {
            [_] => Some(None),
            [_, epoch] => epoch.parse::<u64>().ok().map(Some),
            _ => None,
        }
    }
}
