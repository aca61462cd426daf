//! Pipeline runtime configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bounds for the sampling and emission cadences, in Hz.
pub const MIN_RATE_HZ: u32 = 100;
pub const MAX_RATE_HZ: u32 = 250;

const DEFAULT_RATE_HZ: u32 = 180;

/// Tunables for one pipeline instance.
///
/// All fields have defaults so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hardware sampling cadence.
    pub sample_rate_hz: u32,
    /// Virtual output cadence.
    pub emit_rate_hz: u32,
    /// After this long without a fresh sample the emitter holds its last
    /// known value rather than writing anything newer. Zero picks one
    /// sample interval.
    pub staleness_ms: u64,
    /// How often the registry re-enumerates hardware.
    pub enumeration_interval_ms: u64,
    /// Where calibration curves persist.
    pub cache_path: PathBuf,
    /// Claim an exclusivity lease over each device on connect.
    pub hide_devices: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_RATE_HZ,
            emit_rate_hz: DEFAULT_RATE_HZ,
            staleness_ms: 0,
            enumeration_interval_ms: 1000,
            cache_path: PathBuf::from("curve_cache.json"),
            hide_devices: true,
        }
    }
}

impl PipelineConfig {
    /// Sampling interval, with the rate clamped into the supported band.
    pub fn sample_interval(&self) -> std::time::Duration {
        interval_for(self.sample_rate_hz)
    }

    /// Emission interval, with the rate clamped into the supported band.
    pub fn emit_interval(&self) -> std::time::Duration {
        interval_for(self.emit_rate_hz)
    }

    /// Staleness cutoff for the emitter.
    pub fn staleness(&self) -> std::time::Duration {
        if self.staleness_ms == 0 {
            self.sample_interval()
        } else {
            std::time::Duration::from_millis(self.staleness_ms)
        }
    }

    /// Re-enumeration cadence.
    pub fn enumeration_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.enumeration_interval_ms.max(100))
    }
}

fn interval_for(rate_hz: u32) -> std::time::Duration {
    let rate = rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
    std::time::Duration::from_secs_f64(1.0 / f64::from(rate))
}
