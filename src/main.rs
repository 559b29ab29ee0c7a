/*
 * This file is part of Fanpilot.
 *
 * Copyright (C) 2025 Fanpilot contributors
 *
 * Fanpilot is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fanpilot is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fanpilot. If not, see <https://www.gnu.org/licenses/>.
 */

//! Fanpilot daemon (fanpilotd)
//!
//! Exit status: 0 after a signal-triggered shutdown, 1 after any fatal error
//! (configuration, fan reset, PWM write), 2 on invalid arguments.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use fanpilot::cli::Cli;
use fanpilot::{logger, resolve_config, validate_config, Controller, Shutdown};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Writing hwmon files needs root; only warn so unprivileged test setups work
fn warn_if_unprivileged() {
    // SAFETY: geteuid has no preconditions and only returns the effective user ID.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        warn!(euid, "Not running as root, PWM writes will likely fail");
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (mut config, origin) =
        resolve_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(poll_interval_ms) = cli.poll_interval_ms {
        config.poll_interval_ms = poll_interval_ms;
        validate_config(&config).context("Invalid --poll-interval-ms")?;
    }

    info!(
        config = %origin,
        sources = config.sources.len(),
        fans = config.fans.len(),
        interval_ms = config.poll_interval_ms,
        "Configuration ready"
    );

    if cli.check {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    warn_if_unprivileged();

    let shutdown = Arc::new(Shutdown::new());
    let handler_shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        handler_shutdown.request();
    })
    .context("Failed to install signal handler")?;

    let mut controller = Controller::from_config(&config)?;
    controller.run(&shutdown).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = logger::resolve_level(cli.log_level.as_deref());
    let target = logger::init_logging(&level);
    info!("STARTUP: fanpilotd {} starting", VERSION);
    info!("STARTUP: Logging to {} at level {}", target, level);

    match run(cli).await {
        Ok(()) => {
            info!("SHUTDOWN: fanpilotd terminated gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("SHUTDOWN: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
