//! Per-axis calibration application with atomic curve-table swap.
//!
//! The sampling tick never takes a lock that a control operation can hold
//! for long: readers grab an `Arc` snapshot of the current table and work
//! from it for the whole tick, while installs build a new table off to the
//! side and swap the pointer under a write lock held only for the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use openpedal_curves::CalibrationCurve;
use openpedal_curves::PedalAxis;
use parking_lot::RwLock;

use crate::device::{AxisDescriptor, DeviceId};

/// Immutable mapping of `(device, axis)` to its active curve.
///
/// Cloning the map on every install keeps the hot path allocation-free:
/// a tick clones one `Arc`, never the table.
#[derive(Debug, Default, Clone)]
pub struct CurveTable {
    curves: BTreeMap<(DeviceId, PedalAxis), Arc<CalibrationCurve>>,
}

impl CurveTable {
    /// Active curve for one axis, if any.
    pub fn curve(&self, device: &DeviceId, axis: PedalAxis) -> Option<&Arc<CalibrationCurve>> {
        self.curves.get(&(device.clone(), axis))
    }

    /// Normalize one raw reading.
    ///
    /// With a curve installed, applies it. Without one, falls back to a
    /// plain rescale over the axis's raw domain, so an uncalibrated pedal
    /// still works.
    pub fn normalize(&self, device: &DeviceId, descriptor: &AxisDescriptor, raw: f32) -> f32 {
        match self.curve(device, descriptor.axis) {
            Some(curve) => curve.apply(raw),
            None => descriptor.domain.rescale(raw),
        }
    }

    /// Number of installed curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Whether no curves are installed.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Owner of the active [`CurveTable`].
///
/// Install and remove are two-phase: the new table is fully built before
/// the swap, so a sampling tick observes either the old set of curves or
/// the new one, never a half-applied edit.
#[derive(Debug, Default)]
pub struct CalibrationEngine {
    table: RwLock<Arc<CurveTable>>,
}

impl CalibrationEngine {
    /// Engine with no curves installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current table for one tick.
    pub fn snapshot(&self) -> Arc<CurveTable> {
        Arc::clone(&self.table.read())
    }

    /// Install a validated curve for one axis, replacing any prior curve.
    ///
    /// Takes effect on the next sampling tick; a tick already in flight
    /// finishes under its snapshot.
    pub fn install(&self, device: DeviceId, axis: PedalAxis, curve: CalibrationCurve) {
        let mut next = CurveTable::clone(&self.snapshot());
        next.curves.insert((device, axis), Arc::new(curve));
        *self.table.write() = Arc::new(next);
    }

    /// Remove the curve for one axis, reverting it to the rescale fallback.
    pub fn remove(&self, device: &DeviceId, axis: PedalAxis) -> bool {
        let mut next = CurveTable::clone(&self.snapshot());
        let removed = next.curves.remove(&(device.clone(), axis)).is_some();
        if removed {
            *self.table.write() = Arc::new(next);
        }
        removed
    }

    /// Install every curve from an iterator in one swap.
    pub fn install_all(
        &self,
        curves: impl IntoIterator<Item = (DeviceId, PedalAxis, CalibrationCurve)>,
    ) {
        let mut next = CurveTable::clone(&self.snapshot());
        for (device, axis, curve) in curves {
            next.curves.insert((device, axis), Arc::new(curve));
        }
        *self.table.write() = Arc::new(next);
    }
}
