//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the damping schedule, the singularity threshold of the
//! Gauss-Jordan solver and the diagnostic verbosity of the solver.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Initial value of the damping factor. Default: 1e-3
    pub lamda: f64,

    /// Factor by which lamda grows after a rejected step. Default: 10.0
    pub lamda_increase_factor: f64,

    /// Factor by which lamda shrinks after an accepted step. Default: 0.1
    pub lamda_decrease_factor: f64,

    /// Smallest acceptable pivot in Gauss-Jordan elimination. Default: 1e-8
    pub singular_threshold: f64,

    /// Diagnostic level: 0 silent, 1 summary, 2 per iteration, 3 per datum. Default: 0
    pub verbose: u8,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            lamda: 1e-3,
            lamda_increase_factor: 10.0,
            lamda_decrease_factor: 0.1,
            singular_threshold: 1e-8,
            verbose: 0,
        }
    }
}

impl LmConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
