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

//! Constants and configuration defaults for Fanpilot
//!
//! Centralizes magic numbers, paths and defaults. Add new values here rather
//! than inlining them at the call site.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Default topology file
    pub const DEFAULT_CONFIG: &str = "/etc/fanpilot/config.json";

    /// Presence of this socket means journald is available
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";

    /// Suffix appended to a PWM file name to get its mode control file
    pub const ENABLE_SUFFIX: &str = "_enable";
}

/// PWM control values
pub mod pwm {
    /// PWM enable modes written to `pwmN_enable`
    pub mod enable {
        /// Manual (software) control
        pub const MANUAL: &str = "1";
    }
}

/// Sensor source reading
pub mod source {
    /// Bytes read from a source endpoint; sysfs values are far shorter
    pub const MAX_READ_BYTES: usize = 32;
}

/// Control loop timing
pub mod timing {
    use super::Duration;

    /// Delay between two poll cycles
    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Bounds accepted for a configured poll interval
    pub const MIN_POLL_INTERVAL_MS: u64 = 100;
    pub const MAX_POLL_INTERVAL_MS: u64 = 60 * 60 * 1000;
}

/// Resource limits
pub mod limits {
    /// Maximum topology file size
    pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

    /// Maximum number of sources or fans in a topology
    pub const MAX_ENTRIES: usize = 64;

    /// Maximum length of a source name
    pub const MAX_NAME_LEN: usize = 128;
}

/// Built-in topology used when no configuration file is present
pub mod default_topology {
    pub const CPU_SOURCE: &str = "/sys/devices/platform/coretemp.0/hwmon/hwmon1/temp1_input";
    pub const DISK_SOURCE: &str =
        "/sys/devices/pci0000:00/0000:00:17.0/ata1/host0/target0:0:0/0:0:0:0/hwmon/hwmon3/temp1_input";
    pub const CASE_PWM: &str = "/sys/devices/platform/nct6775.672/hwmon/hwmon2/pwm2";

    pub const CASE_PWM_MIN: u8 = 60;
    pub const CASE_PWM_MAX: u8 = 240;

    /// Millidegrees Celsius
    pub const CPU_RANGE: (i32, i32) = (60_000, 80_000);
    pub const DISK_RANGE: (i32, i32) = (42_000, 50_000);
}

/// Logging
pub mod logging {
    /// Environment variable holding the default log filter
    pub const LOG_ENV: &str = "FANPILOT_LOG";

    pub const DEFAULT_LEVEL: &str = "info";
}
