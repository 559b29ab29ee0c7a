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

//! Static topology: which sources exist, which fans they drive, and the
//! calibration of every binding. Loaded once at startup, never reloaded.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fp_error::{FanpilotError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::Aggregate;
use crate::constants::{default_topology, limits, paths, timing};

fn default_poll_interval_ms() -> u64 {
    timing::POLL_INTERVAL.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Name referenced by drivers
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Name of a configured source
    pub source: String,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FanConfig {
    pub pwm: PathBuf,
    pub pwm_min: u8,
    pub pwm_max: u8,
    #[serde(default)]
    pub aggregate: Aggregate,
    pub drivers: Vec<DriverConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    pub sources: Vec<SourceConfig>,
    pub fans: Vec<FanConfig>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Topology used when no configuration file exists: CPU package and disk
    /// temperature driving one case fan.
    pub fn builtin() -> Self {
        let (cpu_min, cpu_max) = default_topology::CPU_RANGE;
        let (disk_min, disk_max) = default_topology::DISK_RANGE;
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            sources: vec![
                SourceConfig {
                    name: "cpu".to_string(),
                    path: PathBuf::from(default_topology::CPU_SOURCE),
                },
                SourceConfig {
                    name: "disk".to_string(),
                    path: PathBuf::from(default_topology::DISK_SOURCE),
                },
            ],
            fans: vec![FanConfig {
                pwm: PathBuf::from(default_topology::CASE_PWM),
                pwm_min: default_topology::CASE_PWM_MIN,
                pwm_max: default_topology::CASE_PWM_MAX,
                aggregate: Aggregate::Max,
                drivers: vec![
                    DriverConfig { source: "cpu".to_string(), min: cpu_min, max: cpu_max },
                    DriverConfig { source: "disk".to_string(), min: disk_min, max: disk_max },
                ],
            }],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Builtin => f.write_str("built-in defaults"),
        }
    }
}

fn is_safe_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= limits::MAX_NAME_LEN
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '@'))
}

/// Check every invariant the runtime relies on without re-checking
pub fn validate_config(cfg: &Config) -> Result<()> {
    if !(timing::MIN_POLL_INTERVAL_MS..=timing::MAX_POLL_INTERVAL_MS).contains(&cfg.poll_interval_ms) {
        return Err(FanpilotError::invalid_config(
            "poll_interval_ms",
            format!(
                "{} out of range ({}..={})",
                cfg.poll_interval_ms,
                timing::MIN_POLL_INTERVAL_MS,
                timing::MAX_POLL_INTERVAL_MS
            ),
        ));
    }

    if cfg.sources.len() > limits::MAX_ENTRIES || cfg.fans.len() > limits::MAX_ENTRIES {
        return Err(FanpilotError::config(format!(
            "too many sources or fans (max {})",
            limits::MAX_ENTRIES
        )));
    }

    let mut names = HashSet::new();
    for (i, source) in cfg.sources.iter().enumerate() {
        if !is_safe_name(&source.name) {
            return Err(FanpilotError::invalid_config(
                format!("sources[{}].name", i),
                format!("invalid name '{}'", source.name),
            ));
        }
        if !names.insert(source.name.as_str()) {
            return Err(FanpilotError::invalid_config(
                format!("sources[{}].name", i),
                format!("duplicate source '{}'", source.name),
            ));
        }
        if source.path.as_os_str().is_empty() {
            return Err(FanpilotError::invalid_config(format!("sources[{}].path", i), "empty path"));
        }
    }

    if cfg.fans.is_empty() {
        return Err(FanpilotError::config("no fans configured"));
    }

    let mut pwm_paths = HashSet::new();
    for (i, fan) in cfg.fans.iter().enumerate() {
        if fan.pwm.file_name().is_none() {
            return Err(FanpilotError::invalid_config(
                format!("fans[{}].pwm", i),
                format!("'{}' does not name a file", fan.pwm.display()),
            ));
        }
        if !pwm_paths.insert(fan.pwm.as_path()) {
            return Err(FanpilotError::invalid_config(
                format!("fans[{}].pwm", i),
                format!("duplicate fan '{}'", fan.pwm.display()),
            ));
        }
        if fan.pwm_max <= fan.pwm_min {
            return Err(FanpilotError::invalid_config(
                format!("fans[{}]", i),
                format!("pwm_max ({}) must be greater than pwm_min ({})", fan.pwm_max, fan.pwm_min),
            ));
        }
        if fan.drivers.is_empty() {
            return Err(FanpilotError::invalid_config(format!("fans[{}].drivers", i), "no drivers"));
        }

        for (j, driver) in fan.drivers.iter().enumerate() {
            let field = format!("fans[{}].drivers[{}]", i, j);
            if !names.contains(driver.source.as_str()) {
                return Err(FanpilotError::invalid_config(
                    field,
                    format!("unknown source '{}'", driver.source),
                ));
            }
            if driver.min >= driver.max {
                return Err(FanpilotError::invalid_config(
                    field,
                    format!("min ({}) must be less than max ({})", driver.min, driver.max),
                ));
            }
        }
    }

    Ok(())
}

/// Read, parse and validate a configuration file
pub fn load_config(path: &Path) -> Result<Config> {
    let metadata = fs::metadata(path).map_err(|e| FanpilotError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > limits::MAX_CONFIG_SIZE {
        return Err(FanpilotError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: limits::MAX_CONFIG_SIZE,
        });
    }

    let data = fs::read_to_string(path).map_err(|e| FanpilotError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let cfg: Config = serde_json::from_str(&data)?;
    validate_config(&cfg)?;

    debug!(path = %path.display(), sources = cfg.sources.len(), fans = cfg.fans.len(), "Configuration loaded");
    Ok(cfg)
}

/// Pick the configuration to run with.
///
/// An explicitly requested file must load. Otherwise the default path is used
/// when it exists, and the built-in topology when it does not.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(Config, ConfigOrigin)> {
    resolve_config_from(explicit, Path::new(paths::DEFAULT_CONFIG))
}

fn resolve_config_from(explicit: Option<&Path>, default_path: &Path) -> Result<(Config, ConfigOrigin)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, ConfigOrigin::File(path.to_path_buf())));
    }

    if default_path.exists() {
        return Ok((load_config(default_path)?, ConfigOrigin::File(default_path.to_path_buf())));
    }

    info!(path = %default_path.display(), "No configuration file, using built-in topology");
    let cfg = Config::builtin();
    validate_config(&cfg)?;
    Ok((cfg, ConfigOrigin::Builtin))
}
