// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::Result;

use crate::cmd::{usage_error, Command};

pub(super) fn start(cmd: &Command, args: &[String]) -> Result<()> {
    if !args.is_empty() {
        usage_error(Some(cmd), "version takes no arguments");
    }
    println!("kiln {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
