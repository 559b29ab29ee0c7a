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

//! Fans (actuators)
//!
//! A [`Fan`] owns its duty range, the drivers feeding it, its aggregation
//! strategy and its PWM output.
//!
//! # Update
//!
//! Every driver's coefficient is computed first. If any source is unavailable
//! nothing is written, the fan keeps its last commanded duty and the
//! recoverable `SourceUnavailable` error is returned. Otherwise the aggregate
//! is mapped onto `pwm_min..=pwm_max` with truncation and written. A failed
//! write is returned to the caller and is fatal.
//!
//! # Reset
//!
//! Requests manual mode through `pwmN_enable`, then commands `pwm_max`.
//! A missing enable file means the fan needs no enabling.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use fp_error::{FanpilotError, Result};
use tracing::{debug, info, trace};

use crate::aggregate::Aggregate;
use crate::constants::{paths, pwm};
use crate::driver::Driver;
use crate::source::SourceSet;

/// Result of asking an output for manual control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// Manual mode was requested successfully
    Enabled,
    /// The output has no mode switch
    NotRequired,
}

/// Write side of a fan
#[cfg_attr(test, mockall::automock)]
pub trait PwmOutput: Send {
    /// Request manual (software) control
    fn enable_manual(&mut self) -> Result<EnableOutcome>;

    /// Command a duty value
    fn write_duty(&mut self, value: u8) -> Result<()>;
}

/// Path of the mode control file belonging to a PWM file (`pwm2` -> `pwm2_enable`)
pub fn enable_path_for(pwm_path: &Path) -> PathBuf {
    let file_name = pwm_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    pwm_path.with_file_name(format!("{}{}", file_name, paths::ENABLE_SUFFIX))
}

/// hwmon PWM output. Files are opened for writing but never created.
#[derive(Debug, Clone)]
pub struct SysfsPwm {
    pwm_path: PathBuf,
    enable_path: PathBuf,
}

impl SysfsPwm {
    pub fn new(pwm_path: impl Into<PathBuf>) -> Self {
        let pwm_path = pwm_path.into();
        let enable_path = enable_path_for(&pwm_path);
        Self { pwm_path, enable_path }
    }

    pub fn pwm_path(&self) -> &Path {
        &self.pwm_path
    }

    pub fn enable_path(&self) -> &Path {
        &self.enable_path
    }
}

impl PwmOutput for SysfsPwm {
    fn enable_manual(&mut self) -> Result<EnableOutcome> {
        let mut file = match OpenOptions::new().write(true).truncate(true).open(&self.enable_path) {
            Ok(f) => f,
            Err(e) => {
                debug!(
                    path = %self.enable_path.display(),
                    error = %e,
                    "Could not open enable file, assuming fan does not need enabling"
                );
                return Ok(EnableOutcome::NotRequired);
            }
        };

        file.write_all(pwm::enable::MANUAL.as_bytes())
            .map_err(|e| FanpilotError::EnableWrite {
                path: self.enable_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(EnableOutcome::Enabled)
    }

    fn write_duty(&mut self, value: u8) -> Result<()> {
        let pwm_write_error = |e: std::io::Error| FanpilotError::PwmWrite {
            path: self.pwm_path.clone(),
            value,
            reason: e.to_string(),
        };

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.pwm_path)
            .map_err(pwm_write_error)?;

        file.write_all(value.to_string().as_bytes())
            .map_err(pwm_write_error)
    }
}

/// Duty for an aggregate coefficient: `pwm_min + trunc((pwm_max - pwm_min) * scale)`
pub fn compute_duty(pwm_min: u8, pwm_max: u8, scale: f64) -> u8 {
    let range = f64::from(pwm_max.saturating_sub(pwm_min));
    // `as` truncates toward zero; the product never exceeds `range`
    pwm_min + (range * scale.clamp(0.0, 1.0)) as u8
}

pub struct Fan {
    name: String,
    pwm_min: u8,
    pwm_max: u8,
    aggregate: Aggregate,
    drivers: Vec<Driver>,
    output: Box<dyn PwmOutput>,
    last_duty: Option<u8>,
}

impl Fan {
    /// `pwm_max > pwm_min` is checked by configuration validation.
    pub fn new(
        name: impl Into<String>,
        pwm_min: u8,
        pwm_max: u8,
        aggregate: Aggregate,
        output: impl PwmOutput + 'static,
    ) -> Self {
        debug_assert!(pwm_max > pwm_min, "fan duty range requires pwm_max > pwm_min");
        Self {
            name: name.into(),
            pwm_min,
            pwm_max,
            aggregate,
            drivers: Vec::new(),
            output: Box::new(output),
            last_duty: None,
        }
    }

    /// Fan driven through an hwmon PWM file, named after that file
    pub fn sysfs(pwm_path: impl Into<PathBuf>, pwm_min: u8, pwm_max: u8, aggregate: Aggregate) -> Self {
        let output = SysfsPwm::new(pwm_path);
        let name = output.pwm_path().display().to_string();
        Self::new(name, pwm_min, pwm_max, aggregate, output)
    }

    /// Drivers are evaluated in insertion order
    pub fn add_driver(&mut self, driver: Driver) {
        self.drivers.push(driver);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    pub fn duty_range(&self) -> (u8, u8) {
        (self.pwm_min, self.pwm_max)
    }

    /// Last duty successfully written, if any
    pub fn last_duty(&self) -> Option<u8> {
        self.last_duty
    }

    /// Recompute and write the duty. An unavailable source leaves the duty
    /// untouched and is reported as a non-fatal error.
    pub fn update(&mut self, sources: &SourceSet) -> Result<()> {
        let coefficients = self
            .drivers
            .iter()
            .map(|driver| driver.coefficient(sources))
            .collect::<Result<Vec<f64>>>()?;
        trace!(fan = %self.name, ?coefficients, "Got coefficients");

        let scale = self.aggregate.apply(&coefficients);
        let duty = compute_duty(self.pwm_min, self.pwm_max, scale);
        self.set_pwm(duty)?;

        info!(fan = %self.name, duty, "Fan set to PWM {}", duty);
        Ok(())
    }

    /// Manual mode, then the top of the duty range. Any failure is fatal for the controller.
    pub fn reset(&mut self) -> Result<()> {
        match self.output.enable_manual() {
            Ok(EnableOutcome::Enabled) => debug!(fan = %self.name, "Manual control enabled"),
            Ok(EnableOutcome::NotRequired) => debug!(fan = %self.name, "Fan needs no enabling"),
            Err(e) => return Err(FanpilotError::reset_failed(&self.name, e)),
        }

        self.set_pwm(self.pwm_max)
            .map_err(|e| FanpilotError::reset_failed(&self.name, e))
    }

    fn set_pwm(&mut self, value: u8) -> Result<()> {
        self.output.write_duty(value)?;
        self.last_duty = Some(value);
        trace!(fan = %self.name, value, "PWM set");
        Ok(())
    }
}

impl fmt::Debug for Fan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fan")
            .field("name", &self.name)
            .field("pwm_min", &self.pwm_min)
            .field("pwm_max", &self.pwm_max)
            .field("aggregate", &self.aggregate)
            .field("drivers", &self.drivers)
            .field("last_duty", &self.last_duty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MockReading, Source, SourceId};
    use crate::test_utils::EventLog;
    use std::fs;
    use tempfile::TempDir;

    fn fixed_source(set: &mut SourceSet, label: &str, value: Option<i32>) -> SourceId {
        let mut reader = MockReading::new();
        match value {
            Some(v) => reader.expect_read().returning(move || Ok(v)),
            None => reader
                .expect_read()
                .returning(|| Err(FanpilotError::source_read("/dev/null", "unreadable"))),
        };
        set.insert(Source::new(label, reader))
    }

    fn accepting_output() -> MockPwmOutput {
        let mut output = MockPwmOutput::new();
        output.expect_enable_manual().returning(|| Ok(EnableOutcome::Enabled));
        output.expect_write_duty().returning(|_| Ok(()));
        output
    }

    #[test]
    fn test_compute_duty_reference() {
        assert_eq!(compute_duty(60, 240, 0.5), 150);
        assert_eq!(compute_duty(60, 240, 0.0), 60);
        assert_eq!(compute_duty(60, 240, 1.0), 240);
        assert_eq!(compute_duty(0, 255, 1.0), 255);
    }

    #[test]
    fn test_compute_duty_truncates() {
        // 180 * 0.999 = 179.82
        assert_eq!(compute_duty(60, 240, 0.999), 239);
        // 255 * 0.5 = 127.5
        assert_eq!(compute_duty(0, 255, 0.5), 127);
    }

    #[test]
    fn test_enable_path_for() {
        assert_eq!(
            enable_path_for(Path::new("/sys/class/hwmon/hwmon2/pwm2")),
            PathBuf::from("/sys/class/hwmon/hwmon2/pwm2_enable")
        );
    }

    #[test]
    fn test_update_writes_aggregated_duty() {
        let mut sources = SourceSet::new();
        let cpu = fixed_source(&mut sources, "cpu", Some(70_000));
        let disk = fixed_source(&mut sources, "disk", Some(43_000));
        sources.update_all();

        let mut output = MockPwmOutput::new();
        output.expect_write_duty().withf(|v| *v == 150).times(1).returning(|_| Ok(()));

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, output);
        fan.add_driver(Driver::new(cpu, 60_000, 80_000));
        fan.add_driver(Driver::new(disk, 42_000, 50_000));

        fan.update(&sources).unwrap();
        assert_eq!(fan.last_duty(), Some(150));
    }

    #[test]
    fn test_update_holds_duty_when_source_missing() {
        let mut sources = SourceSet::new();
        let cpu = fixed_source(&mut sources, "cpu", Some(70_000));
        let disk = fixed_source(&mut sources, "disk", None);
        sources.update_all();

        let mut output = MockPwmOutput::new();
        output.expect_enable_manual().returning(|| Ok(EnableOutcome::NotRequired));
        output.expect_write_duty().withf(|v| *v == 240).times(1).returning(|_| Ok(()));

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, output);
        fan.add_driver(Driver::new(cpu, 60_000, 80_000));
        fan.add_driver(Driver::new(disk, 42_000, 50_000));

        fan.reset().unwrap();
        assert_eq!(fan.last_duty(), Some(240));

        let err = fan.update(&sources).unwrap_err();
        assert!(matches!(err, FanpilotError::SourceUnavailable { ref source_label } if source_label == "disk"));
        assert!(!err.is_fatal());
        assert_eq!(fan.last_duty(), Some(240));
    }

    #[test]
    fn test_update_write_failure_is_fatal() {
        let mut sources = SourceSet::new();
        let cpu = fixed_source(&mut sources, "cpu", Some(65_000));
        sources.update_all();

        let mut output = MockPwmOutput::new();
        output.expect_write_duty().returning(|value| {
            Err(FanpilotError::PwmWrite {
                path: PathBuf::from("/sys/class/hwmon/hwmon2/pwm2"),
                value,
                reason: "Permission denied".to_string(),
            })
        });

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, output);
        fan.add_driver(Driver::new(cpu, 60_000, 80_000));

        let err = fan.update(&sources).unwrap_err();
        assert!(matches!(err, FanpilotError::PwmWrite { value: 105, .. }));
        assert!(err.is_fatal());
        assert_eq!(fan.last_duty(), None);
    }

    #[test]
    fn test_reset_commands_duty_max_from_any_state() {
        let mut sources = SourceSet::new();
        let cpu = fixed_source(&mut sources, "cpu", Some(60_000));
        sources.update_all();

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, accepting_output());
        fan.add_driver(Driver::new(cpu, 60_000, 80_000));

        fan.update(&sources).unwrap();
        assert_eq!(fan.last_duty(), Some(60));

        fan.reset().unwrap();
        assert_eq!(fan.last_duty(), Some(240));
    }

    #[test]
    fn test_reset_writes_only_duty_max() {
        let writes = EventLog::default();
        let recorded = writes.clone();
        let mut output = MockPwmOutput::new();
        output.expect_enable_manual().returning(|| Ok(EnableOutcome::Enabled));
        output.expect_write_duty().returning(move |value| {
            recorded.push(value.to_string());
            Ok(())
        });

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, output);
        fan.reset().unwrap();
        fan.reset().unwrap();

        assert_eq!(writes.events(), vec!["240", "240"]);
        assert_eq!(fan.duty_range(), (60, 240));
    }

    #[test]
    fn test_reset_enable_failure_skips_duty_write() {
        let mut output = MockPwmOutput::new();
        output.expect_enable_manual().returning(|| {
            Err(FanpilotError::EnableWrite {
                path: PathBuf::from("/sys/class/hwmon/hwmon2/pwm2_enable"),
                reason: "Invalid argument".to_string(),
            })
        });
        output.expect_write_duty().times(0);

        let mut fan = Fan::new("pwm2", 60, 240, Aggregate::Max, output);
        let err = fan.reset().unwrap_err();
        assert!(matches!(err, FanpilotError::ResetFailed { ref fan, .. } if fan == "pwm2"));
    }

    #[test]
    fn test_fan_without_drivers_runs_full_range() {
        let mut fan = Fan::new("pwm1", 10, 200, Aggregate::Mean, accepting_output());
        fan.update(&SourceSet::new()).unwrap();
        assert_eq!(fan.last_duty(), Some(200));
    }

    #[test]
    fn test_sysfs_reset_without_enable_file() {
        let dir = TempDir::new().unwrap();
        let pwm_path = dir.path().join("pwm2");
        fs::write(&pwm_path, "128").unwrap();

        let mut fan = Fan::sysfs(&pwm_path, 60, 240, Aggregate::Max);
        fan.reset().unwrap();

        assert_eq!(fs::read_to_string(&pwm_path).unwrap(), "240");
        assert!(!dir.path().join("pwm2_enable").exists());
    }

    #[test]
    fn test_sysfs_reset_with_enable_file() {
        let dir = TempDir::new().unwrap();
        let pwm_path = dir.path().join("pwm2");
        let enable_path = dir.path().join("pwm2_enable");
        fs::write(&pwm_path, "128").unwrap();
        fs::write(&enable_path, "2").unwrap();

        let mut output = SysfsPwm::new(&pwm_path);
        assert_eq!(output.enable_path(), enable_path.as_path());
        assert_eq!(output.enable_manual().unwrap(), EnableOutcome::Enabled);
        assert_eq!(fs::read_to_string(&enable_path).unwrap(), "1");
    }

    #[test]
    fn test_sysfs_write_missing_pwm_file() {
        let dir = TempDir::new().unwrap();
        let mut output = SysfsPwm::new(dir.path().join("pwm7"));
        let err = output.write_duty(100).unwrap_err();
        assert!(matches!(err, FanpilotError::PwmWrite { value: 100, .. }));
        assert!(!dir.path().join("pwm7").exists());
    }
}
