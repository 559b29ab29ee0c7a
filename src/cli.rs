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

//! Command line interface of the `fanpilotd` daemon

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fanpilotd")]
#[command(version)]
#[command(about = "Fanpilot - feed-forward fan control for Linux hwmon")]
#[command(long_about = "Fanpilot - feed-forward fan control for Linux hwmon

Polls temperature sources, scales each reading into a coefficient, combines
the coefficients per fan and writes the resulting PWM duty. On startup and on
every exit path all fans are switched to manual mode at their maximum duty.

ENVIRONMENT VARIABLES:
    FANPILOT_LOG=debug     Log filter (overridden by --log-level)

FILES:
    /etc/fanpilot/config.json   Topology (built-in defaults when absent)")]
pub struct Cli {
    /// Topology file; must exist when given
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured poll interval
    #[arg(short, long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Log filter (trace, debug, info, warn, error or tracing directives)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Validate the configuration, print it and exit without touching fans
    #[arg(long)]
    pub check: bool,
}
