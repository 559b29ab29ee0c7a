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

//! Coefficient aggregation strategies

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output when there is nothing to aggregate: full speed
const EMPTY_RESULT: f64 = 1.0;

/// Reduces the coefficients of a fan's drivers to a single value in `[0.0, 1.0]`.
///
/// All strategies ignore input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// Follow the most demanding input
    #[default]
    Max,
    /// Arithmetic mean of all inputs
    Mean,
    /// Follow the least demanding input
    Min,
}

impl Aggregate {
    pub fn apply(&self, coefficients: &[f64]) -> f64 {
        if coefficients.is_empty() {
            return EMPTY_RESULT;
        }

        let result = match self {
            Aggregate::Max => coefficients.iter().copied().fold(f64::MIN, f64::max),
            Aggregate::Min => coefficients.iter().copied().fold(f64::MAX, f64::min),
            Aggregate::Mean => {
                // Sorted summation keeps the mean bit-identical across permutations
                let mut sorted = coefficients.to_vec();
                sorted.sort_by(f64::total_cmp);
                sorted.iter().sum::<f64>() / sorted.len() as f64
            }
        };

        result.clamp(0.0, 1.0)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Max => "max",
            Aggregate::Mean => "mean",
            Aggregate::Min => "min",
        };
        f.write_str(name)
    }
}
