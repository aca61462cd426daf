//! In-memory port implementations for tests.
//!
//! These stand in for real hardware in the integration tests and in any
//! downstream harness that wants a pipeline without devices attached.
//! Each mock is `Arc`-shareable and mutated through interior locks so a
//! test can change hardware behavior while the pipeline runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use openpedal_curves::PedalAxis;
use openpedal_errors::PipelineFault;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::device::{Device, DeviceId};
use crate::mapping::VirtualSlot;
use crate::ports::{
    AxisReadings, DeviceHiderPort, ExclusiveLease, PedalInputPort, VirtualOutputPort,
};

/// Scriptable pedal hardware.
#[derive(Debug, Default)]
pub struct MockPedals {
    state: Mutex<MockPedalsState>,
}

#[derive(Debug, Default)]
struct MockPedalsState {
    devices: Vec<Device>,
    values: BTreeMap<(DeviceId, PedalAxis), f32>,
    failing: BTreeSet<DeviceId>,
}

impl MockPedals {
    /// No devices attached.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a device; it shows up on the next enumeration.
    pub fn attach(&self, device: Device) {
        let mut state = self.state.lock();
        state.failing.remove(&device.id);
        state.devices.retain(|d| d.id != device.id);
        state.devices.push(device);
    }

    /// Detach a device; it disappears on the next enumeration.
    pub fn detach(&self, id: &DeviceId) {
        self.state.lock().devices.retain(|d| d.id != *id);
    }

    /// Set the raw value one axis reports.
    pub fn set_value(&self, id: &DeviceId, axis: PedalAxis, raw: f32) {
        self.state.lock().values.insert((id.clone(), axis), raw);
    }

    /// Make every read of this device fail until it is re-attached.
    pub fn fail_reads(&self, id: &DeviceId) {
        self.state.lock().failing.insert(id.clone());
    }
}

#[async_trait]
impl PedalInputPort for MockPedals {
    async fn enumerate(&self) -> Result<Vec<Device>, PipelineFault> {
        Ok(self.state.lock().devices.clone())
    }

    fn sample(&self, device: &DeviceId) -> Result<AxisReadings, PipelineFault> {
        let state = self.state.lock();
        if state.failing.contains(device) {
            return Err(PipelineFault::device_unavailable(
                device.as_str(),
                "simulated read failure",
            ));
        }
        let record = state
            .devices
            .iter()
            .find(|d| d.id == *device)
            .ok_or_else(|| {
                PipelineFault::device_unavailable(device.as_str(), "not attached")
            })?;

        Ok(record
            .axes
            .iter()
            .map(|descriptor| {
                let raw = state
                    .values
                    .get(&(device.clone(), descriptor.axis))
                    .copied()
                    .unwrap_or(descriptor.domain.min);
                (descriptor.axis, raw)
            })
            .collect())
    }
}

/// Device hider that records claims and can be told to fail.
#[derive(Debug)]
pub struct MockHider {
    fail: Mutex<bool>,
    claimed: Mutex<Vec<DeviceId>>,
    release_tx: mpsc::UnboundedSender<DeviceId>,
    release_rx: Mutex<mpsc::UnboundedReceiver<DeviceId>>,
}

impl Default for MockHider {
    fn default() -> Self {
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        Self {
            fail: Mutex::new(false),
            claimed: Mutex::new(Vec::new()),
            release_tx,
            release_rx: Mutex::new(release_rx),
        }
    }
}

impl MockHider {
    /// Working hider.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent claims fail (capability missing).
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Devices claimed so far, in order.
    pub fn claimed(&self) -> Vec<DeviceId> {
        self.claimed.lock().clone()
    }

    /// Devices whose leases have been dropped so far.
    pub fn released(&self) -> Vec<DeviceId> {
        let mut rx = self.release_rx.lock();
        let mut out = Vec::new();
        while let Ok(id) = rx.try_recv() {
            out.push(id);
        }
        out
    }
}

#[async_trait]
impl DeviceHiderPort for MockHider {
    async fn claim(&self, device: &DeviceId) -> Result<ExclusiveLease, PipelineFault> {
        if *self.fail.lock() {
            return Err(PipelineFault::hider_unavailable(
                device.as_str(),
                "simulated hider outage",
            ));
        }
        self.claimed.lock().push(device.clone());
        Ok(ExclusiveLease::new(device.clone(), self.release_tx.clone()))
    }
}

/// Virtual output that records every write.
#[derive(Debug, Default)]
pub struct MockOutput {
    fail: Mutex<bool>,
    writes: Mutex<Vec<(VirtualSlot, f32)>>,
}

impl MockOutput {
    /// Working output device.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent writes fail (driver gone).
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<(VirtualSlot, f32)> {
        self.writes.lock().clone()
    }

    /// Most recent value written to a slot.
    pub fn last_value(&self, slot: VirtualSlot) -> Option<f32> {
        self.writes
            .lock()
            .iter()
            .rev()
            .find(|(s, _)| *s == slot)
            .map(|(_, v)| *v)
    }
}

impl VirtualOutputPort for MockOutput {
    fn emit(&self, slot: VirtualSlot, value: f32) -> Result<(), PipelineFault> {
        if *self.fail.lock() {
            return Err(PipelineFault::output_unavailable("simulated driver outage"));
        }
        self.writes.lock().push((slot, value));
        Ok(())
    }
}
