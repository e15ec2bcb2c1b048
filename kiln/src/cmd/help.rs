// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;

use crate::cmd::{Command, COMMANDS};

pub(super) fn start(_cmd: &Command, _args: &[String]) -> Result<()> {
    println!("usage: kiln <command> [<args>]");
    println!();
    println!("commands:");
    for cmd in COMMANDS {
        println!("  {:<10} {}", cmd.name, cmd.summary);
    }
    Ok(())
}
