//! In-memory form of the persisted curve cache.

use std::collections::BTreeMap;

use openpedal_curves::{CalibrationCurve, PedalAxis};
use openpedal_errors::PipelineFault;
use serde::{Deserialize, Serialize};

/// All persisted calibration curves: device identity → axis → curve.
///
/// `BTreeMap` keeps serialization deterministic, so saving and reloading
/// an unchanged cache produces byte-identical files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveCache {
    devices: BTreeMap<String, BTreeMap<PedalAxis, CalibrationCurve>>,
}

impl CurveCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Curve for a (device, axis) pair, if one is stored.
    pub fn get(&self, device: &str, axis: PedalAxis) -> Option<&CalibrationCurve> {
        self.devices.get(device).and_then(|axes| axes.get(&axis))
    }

    /// Store a curve, replacing any prior entry for the pair.
    pub fn insert(&mut self, device: impl Into<String>, axis: PedalAxis, curve: CalibrationCurve) {
        self.devices.entry(device.into()).or_default().insert(axis, curve);
    }

    /// Remove a curve. Returns the removed entry, pruning the device key
    /// when its last axis goes away.
    pub fn remove(&mut self, device: &str, axis: PedalAxis) -> Option<CalibrationCurve> {
        let axes = self.devices.get_mut(device)?;
        let removed = axes.remove(&axis);
        if axes.is_empty() {
            self.devices.remove(device);
        }
        removed
    }

    /// Device identities with at least one stored curve.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Axes with a stored curve for one device.
    pub fn axes(&self, device: &str) -> Vec<PedalAxis> {
        self.devices
            .get(device)
            .map(|axes| axes.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Total number of stored curves.
    pub fn len(&self) -> usize {
        self.devices.values().map(BTreeMap::len).sum()
    }

    /// Whether no curves are stored.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Decode a cache document, skipping malformed entries.
    ///
    /// A malformed axis entry (unparsable, or failing curve validation)
    /// produces a [`PipelineFault::CacheCorrupt`] and is dropped; every
    /// well-formed entry still loads. An unparsable document yields an
    /// empty cache plus a single fault — never an error.
    pub fn decode_tolerant(text: &str) -> (Self, Vec<PipelineFault>) {
        let mut cache = CurveCache::new();
        let mut faults = Vec::new();

        let root: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                faults.push(PipelineFault::cache_corrupt("*", "*", e.to_string()));
                return (cache, faults);
            }
        };

        let Some(devices) = root.as_object() else {
            faults.push(PipelineFault::cache_corrupt(
                "*",
                "*",
                "top-level document is not an object",
            ));
            return (cache, faults);
        };

        for (device, axes_value) in devices {
            let Some(axes) = axes_value.as_object() else {
                faults.push(PipelineFault::cache_corrupt(
                    device,
                    "*",
                    "device entry is not an object",
                ));
                continue;
            };

            for (axis_name, curve_value) in axes {
                let axis: PedalAxis = match axis_name.parse() {
                    Ok(axis) => axis,
                    Err(e) => {
                        faults.push(PipelineFault::cache_corrupt(device, axis_name, e.to_string()));
                        continue;
                    }
                };

                let curve: CalibrationCurve =
                    match serde_json::from_value(curve_value.clone()) {
                        Ok(curve) => curve,
                        Err(e) => {
                            faults.push(PipelineFault::cache_corrupt(
                                device,
                                axis_name,
                                e.to_string(),
                            ));
                            continue;
                        }
                    };

                if let Err(e) = curve.validate() {
                    faults.push(PipelineFault::cache_corrupt(device, axis_name, e.to_string()));
                    continue;
                }

                cache.insert(device.clone(), axis, curve);
            }
        }

        (cache, faults)
    }
}
