//! Hardware constants consumed by the roofline model.
//!
//! The core ships no defaults: every target machine supplies its own profile, usually as JSON.
//!
//! ```json
//! {
//!   "cpu_hz": 1e9,
//!   "cpu_vector_size": 8,
//!   "cache_line_size": 64,
//!   "main_memory": {
//!     "approx_latency": 1e-7,
//!     "bandwidth": { "sequential_read": 1e10, "sequential_write": 1e10 }
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::env::{self, HARDWARE_PROFILE_VAR};
use crate::error::{RooflineError, RooflineResult};

/// Sequential main-memory throughput, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryBandwidth {
    pub sequential_read: f64,
    pub sequential_write: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainMemory {
    /// Seconds stalled per fetched cache line.
    pub approx_latency: f64,
    pub bandwidth: MemoryBandwidth,
}

/// Per-target constants: clock rate, SIMD width, cache line size and main memory behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareProfile {
    pub cpu_hz: f64,
    /// SIMD width in elements.
    pub cpu_vector_size: usize,
    /// Cache line size in bytes.
    pub cache_line_size: usize,
    pub main_memory: MainMemory,
}

impl HardwareProfile {
    /// Checks that every constant is usable as a divisor or multiplier.
    pub fn validate(&self) -> RooflineResult<()> {
        require_positive("cpu_hz", self.cpu_hz)?;
        require_positive(
            "main_memory.bandwidth.sequential_read",
            self.main_memory.bandwidth.sequential_read,
        )?;
        require_positive(
            "main_memory.bandwidth.sequential_write",
            self.main_memory.bandwidth.sequential_write,
        )?;

        let latency = self.main_memory.approx_latency;
        if !latency.is_finite() || latency < 0.0 {
            return Err(RooflineError::profile(
                "main_memory.approx_latency",
                format!("expected a finite non-negative value, got {latency}"),
            ));
        }
        if self.cpu_vector_size == 0 {
            return Err(RooflineError::profile("cpu_vector_size", "must be at least 1"));
        }
        if self.cache_line_size == 0 {
            return Err(RooflineError::profile("cache_line_size", "must be at least 1"));
        }
        Ok(())
    }

    /// Parses and validates a JSON profile.
    pub fn from_json_str(json: &str) -> RooflineResult<Self> {
        let profile: HardwareProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads and validates a JSON profile from disk.
    pub fn from_path(path: impl AsRef<Path>) -> RooflineResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| RooflineError::ProfileIo {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), ?profile, "loaded hardware profile");
        Ok(profile)
    }

    /// Loads the profile named by `ROOFLINE_HARDWARE_PROFILE`.
    pub fn from_env() -> RooflineResult<Self> {
        let path = env::hardware_profile_path().ok_or(RooflineError::MissingEnv {
            var: HARDWARE_PROFILE_VAR,
        })?;
        Self::from_path(path)
    }

    /// Cache-line granularity expressed in elements of `itemsize` bytes.
    pub(crate) fn elements_per_cache_line(&self, itemsize: usize) -> usize {
        self.cache_line_size / itemsize
    }
}

fn require_positive(field: &'static str, value: f64) -> RooflineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RooflineError::profile(
            field,
            format!("expected a finite positive value, got {value}"),
        ))
    }
}
