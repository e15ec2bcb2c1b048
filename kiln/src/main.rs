// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::env;
use std::process::exit;

use kiln::cmd;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(name) = args.get(1) else {
        cmd::usage_error(None, "no command given; try 'kiln help'");
    };
    let Some(command) = cmd::find_command(name) else {
        cmd::usage_error(None, &format!("unknown command: {name}"));
    };

    if let Err(err) = (command.start)(command, &args[2..]) {
        log::error!("{err:#}");
        exit(1);
    }
}
