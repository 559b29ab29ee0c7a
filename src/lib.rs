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

//! Fanpilot - feed-forward fan control for Linux hwmon
//!
//! Sensor readings are scaled into coefficients by drivers, combined per fan
//! by an aggregation strategy, and written as a PWM duty on every poll cycle.
//!
//! # Module Structure
//!
//! - `source` - polled sensors and the source registry
//! - `driver` - calibrated source-to-fan bindings
//! - `aggregate` - coefficient reduction strategies
//! - `fan` - PWM outputs, duty computation and the reset protocol
//! - `controller` - the poll loop and its state machine
//! - `config` - static topology loading and validation

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod driver;
pub mod fan;
pub mod logger;
pub mod shutdown;
pub mod source;

#[cfg(test)]
pub mod test_utils;

pub use aggregate::Aggregate;
pub use config::{load_config, resolve_config, validate_config, Config, ConfigOrigin};
pub use controller::{Controller, ControllerState};
pub use driver::Driver;
pub use fan::{compute_duty, EnableOutcome, Fan, PwmOutput, SysfsPwm};
pub use fp_error::{FanpilotError, Result};
pub use shutdown::Shutdown;
pub use source::{FileSource, Reading, Source, SourceId, SourceSet};
