// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The multi-command front-end of the `kiln` binary: a name→handler table
//! and its lookup.

use std::process::exit;

mod help;
mod ls_tests;
mod run;
mod version;

/// One entry in the command table.
pub struct Command {
    pub name: &'static str,
    /// One-line description shown by `kiln help`.
    pub summary: &'static str,
    pub start: fn(&Command, &[String]) -> anyhow::Result<()>,
}

pub static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        summary: "list the available commands",
        start: help::start,
    },
    Command {
        name: "ls-tests",
        summary: "list the registered tests in registration order",
        start: ls_tests::start,
    },
    Command {
        name: "run",
        summary: "run tests matching the given patterns (all by default)",
        start: run::start,
    },
    Command {
        name: "version",
        summary: "print the kiln version",
        start: version::start,
    },
];

pub fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Reports a command-line usage error and exits.
///
/// Follows git's precedent: exit with 129 on usage error.
pub fn usage_error(cmd: Option<&Command>, message: &str) -> ! {
    match cmd {
        Some(cmd) => eprintln!("kiln-{}: usage error: {message}", cmd.name),
        None => eprintln!("kiln: usage error: {message}"),
    }
    exit(129)
}
