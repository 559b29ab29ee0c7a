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

//! Control loop
//!
//! ```text
//! Initializing --reset ok--> Running --shutdown / fatal error--> Resetting --> Terminated
//!       |                                                           ^
//!       +-------------------------reset failed----------------------+
//! ```
//!
//! Every fan is reset (manual mode, top of its duty range) before the first cycle and
//! again on every exit path, so fans are never left at an arbitrary duty while
//! the controller is not running.

use std::time::Duration;

use fp_error::{FanpilotError, Result};
use tracing::{debug, error, info, warn};

use crate::config::{validate_config, Config};
use crate::constants::timing;
use crate::driver::Driver;
use crate::fan::Fan;
use crate::shutdown::Shutdown;
use crate::source::{Source, SourceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Running,
    Resetting,
    Terminated,
}

#[derive(Debug)]
pub struct Controller {
    sources: SourceSet,
    fans: Vec<Fan>,
    poll_interval: Duration,
    state: ControllerState,
}

impl Controller {
    pub fn new(sources: SourceSet, fans: Vec<Fan>) -> Self {
        Self {
            sources,
            fans,
            poll_interval: timing::POLL_INTERVAL,
            state: ControllerState::Initializing,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Build file-backed sources and sysfs fans from a configuration
    pub fn from_config(cfg: &Config) -> Result<Self> {
        validate_config(cfg)?;

        let mut sources = SourceSet::new();
        for source in &cfg.sources {
            sources.insert(Source::from_file(&source.name, &source.path));
        }

        let mut fans = Vec::with_capacity(cfg.fans.len());
        for fan_cfg in &cfg.fans {
            let mut fan = Fan::sysfs(&fan_cfg.pwm, fan_cfg.pwm_min, fan_cfg.pwm_max, fan_cfg.aggregate);
            for driver in &fan_cfg.drivers {
                let id = sources.find(&driver.source).ok_or_else(|| {
                    FanpilotError::config(format!("unknown source '{}'", driver.source))
                })?;
                fan.add_driver(Driver::new(id, driver.min, driver.max));
            }
            fans.push(fan);
        }

        Ok(Self::new(sources, fans).with_poll_interval(cfg.poll_interval()))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn fans(&self) -> &[Fan] {
        &self.fans
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "Controller state change");
        self.state = next;
    }

    /// Reset every fan, even after one fails. Returns the first failure.
    pub fn reset_fans(&mut self) -> Result<()> {
        info!("Resetting all fans to manual mode and maximum duty");

        let mut first_error = None;
        for fan in &mut self.fans {
            if let Err(e) = fan.reset() {
                error!(fan = %fan.name(), error = %e, "CRITICAL: failed to reset fan");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// One poll cycle: every source, then every fan, in configuration order
    pub fn cycle(&mut self) -> Result<()> {
        self.sources.update_all();
        for fan in &mut self.fans {
            match fan.update(&self.sources) {
                Ok(()) => {}
                Err(e) if !e.is_fatal() => {
                    warn!(fan = %fan.name(), error = %e, "Source has no value, holding duty");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Run until shutdown is requested or a fan cannot be commanded.
    ///
    /// Returns the error that ended the loop, or the exit reset failure if the
    /// loop itself ended cleanly.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<()> {
        self.transition(ControllerState::Initializing);

        let outcome = match self.reset_fans() {
            Ok(()) => {
                self.transition(ControllerState::Running);
                self.run_loop(shutdown).await
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(()) => info!("Shutdown requested, program will now exit"),
            Err(e) => error!(error = %e, "Control loop stopped, program will now exit"),
        }

        self.transition(ControllerState::Resetting);
        let reset = self.reset_fans();
        self.transition(ControllerState::Terminated);

        outcome.and(reset)
    }

    async fn run_loop(&mut self, shutdown: &Shutdown) -> Result<()> {
        info!(
            sources = self.sources.len(),
            fans = self.fans.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Control loop started"
        );

        while !shutdown.is_requested() {
            self.cycle()?;
            if shutdown.sleep(self.poll_interval).await {
                break;
            }
        }
        Ok(())
    }
}
