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

//! Calibrated binding of a source to a fan
//!
//! A [`Driver`] turns the cached reading of one source into a coefficient in
//! `[0.0, 1.0]` with a clamped linear scale:
//!
//! - reading at or below `min` gives `0.0`
//! - reading at or above `max` gives `1.0`
//! - in between: `(reading - min) / (max - min)`

use fp_error::{FanpilotError, Result};

use crate::source::{SourceId, SourceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Driver {
    source: SourceId,
    min: i32,
    max: i32,
}

impl Driver {
    /// `min < max` is checked by configuration validation, not here.
    pub fn new(source: SourceId, min: i32, max: i32) -> Self {
        debug_assert!(min < max, "driver calibration requires min < max");
        Self { source, min, max }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn range(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    /// Coefficient for the source's current reading.
    ///
    /// Fails with [`FanpilotError::SourceUnavailable`] when the source has no
    /// cached value; there is no default at this layer.
    pub fn coefficient(&self, sources: &SourceSet) -> Result<f64> {
        let source = sources
            .get(self.source)
            .ok_or_else(|| FanpilotError::SourceUnavailable {
                source_label: self.source.to_string(),
            })?;

        let value = source
            .last_value()
            .ok_or_else(|| FanpilotError::SourceUnavailable {
                source_label: source.label().to_string(),
            })?;

        Ok(scale(value, self.min, self.max))
    }
}

/// Clamped linear mapping of `value` onto `[0.0, 1.0]`
pub fn scale(value: i32, min: i32, max: i32) -> f64 {
    if value <= min {
        return 0.0;
    }
    if value >= max {
        return 1.0;
    }

    // i64 so that extreme calibrations cannot overflow
    let range = i64::from(max) - i64::from(min);
    let offset = i64::from(value) - i64::from(min);
    offset as f64 / range as f64
}
