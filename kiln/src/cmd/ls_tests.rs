// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;

use crate::cmd::{usage_error, Command};
use crate::registry::Registry;

pub(super) fn start(cmd: &Command, args: &[String]) -> Result<()> {
    if !args.is_empty() {
        usage_error(Some(cmd), "ls-tests takes no arguments");
    }
    for def in Registry::new().defs() {
        println!("{}", def.name);
    }
    Ok(())
}
