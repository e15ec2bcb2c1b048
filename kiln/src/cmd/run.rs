// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Result};

use crate::cmd::{usage_error, Command};
use crate::registry::Registry;
use crate::runner::Runner;

pub(super) fn start(cmd: &Command, args: &[String]) -> Result<()> {
    let mut patterns = Vec::new();
    for arg in args {
        if arg.starts_with('-') {
            usage_error(Some(cmd), &format!("unknown option: {arg}"));
        }
        patterns.push(arg.clone());
    }

    let mut registry = Registry::new();
    let num_enabled = registry.enable_matching(&patterns);
    log::info!("will run {num_enabled} of {} tests", registry.len());

    let summary = Runner::new(&registry).run();
    if !summary.success() {
        bail!("{} of {} tests failed", summary.fail, summary.total());
    }
    Ok(())
}
