//! Tunables for placement and rebalancing.
//!
//! # Invariants
//! - Distances are finite and strictly positive.
//! - Missing fields fall back to defaults when deserialized.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default gap used for open-ended draws, null placement and rebalancing.
pub const DEFAULT_IDEAL_DISTANCE: f64 = 513.0;

/// Errors raised by [`PositioningConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Distance field is NaN, infinite, zero or negative.
    InvalidDistance { field: &'static str, value: f64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDistance { field, value } => write!(
                f,
                "`{field}` must be a finite positive number, got {value}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Placement configuration shared by the engine and the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    /// Width of the draw window when one side of a move is open.
    pub ideal_distance: f64,
    /// Gap between consecutive items after a rebalance.
    pub rebalance_spacing: f64,
    /// How many rebalance-and-retry rounds a move may trigger on exhaustion.
    pub max_rebalance_attempts: u32,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            ideal_distance: DEFAULT_IDEAL_DISTANCE,
            rebalance_spacing: DEFAULT_IDEAL_DISTANCE,
            max_rebalance_attempts: 1,
        }
    }
}

impl PositioningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ideal_distance", self.ideal_distance),
            ("rebalance_spacing", self.rebalance_spacing),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidDistance { field, value });
            }
        }
        Ok(())
    }
}
