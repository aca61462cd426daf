//! Port traits at the hardware seams.
//!
//! The engine consumes pedal hardware, the device-hiding capability, and
//! the virtual joystick driver through these contracts and never couples
//! to a platform implementation. The crate ships test doubles only (see
//! [`crate::testing`]); real ports live with the platform integration.

use async_trait::async_trait;
use openpedal_curves::PedalAxis;
use openpedal_errors::PipelineFault;
use tokio::sync::mpsc;
use tracing::debug;

use crate::device::{Device, DeviceId};
use crate::mapping::VirtualSlot;

/// One sampling tick's worth of raw readings for a device.
pub type AxisReadings = Vec<(PedalAxis, f32)>;

/// Raw pedal hardware: enumeration plus per-tick sampling.
#[async_trait]
pub trait PedalInputPort: Send + Sync {
    /// List currently connected pedal devices.
    ///
    /// Called at startup and periodically for hot-plug detection; may
    /// block briefly, it never runs on the sampling tick.
    ///
    /// # Errors
    ///
    /// Enumeration failure is a recoverable fault; the registry keeps its
    /// last known view.
    async fn enumerate(&self) -> Result<Vec<Device>, PipelineFault>;

    /// Read all axes of one device.
    ///
    /// Called once per sampling tick and must not block: implementations
    /// return the most recent report. A failure (device busy, removed
    /// mid-tick) marks only this device Disconnected; sampling continues
    /// for the others.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` when the read fails.
    fn sample(&self, device: &DeviceId) -> Result<AxisReadings, PipelineFault>;
}

/// The device-hiding capability, consumed as an opaque claim/release
/// lease. How hiding is implemented on the host is not this crate's
/// concern.
#[async_trait]
pub trait DeviceHiderPort: Send + Sync {
    /// Exclusively claim a device, hiding it from other consumers.
    ///
    /// # Errors
    ///
    /// `HiderUnavailable` when the device is already claimed or the
    /// capability is missing; the pipeline then runs unhidden.
    async fn claim(&self, device: &DeviceId) -> Result<ExclusiveLease, PipelineFault>;
}

/// Exclusivity grant over one physical device.
///
/// Release happens in `Drop`, so every exit path — orderly shutdown,
/// device disconnect, or a panicking pipeline task unwinding — unhides
/// the device.
#[derive(Debug)]
pub struct ExclusiveLease {
    device: DeviceId,
    release_tx: mpsc::UnboundedSender<DeviceId>,
}

impl ExclusiveLease {
    /// Lease for `device`; the hider implementation listens on the paired
    /// receiver and unhides when the lease drops.
    pub fn new(device: DeviceId, release_tx: mpsc::UnboundedSender<DeviceId>) -> Self {
        Self { device, release_tx }
    }

    /// Device this lease covers.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }
}

impl Drop for ExclusiveLease {
    fn drop(&mut self) {
        // Receiver may already be gone at process teardown.
        let _ = self.release_tx.send(self.device.clone());
        debug!(device = %self.device, "exclusive lease released");
    }
}

/// The virtual joystick device, one normalized write per mapped axis.
pub trait VirtualOutputPort: Send + Sync {
    /// Write one normalized value to a virtual axis slot.
    ///
    /// Called once per output tick per mapped slot; must not block.
    ///
    /// # Errors
    ///
    /// `OutputUnavailable` when the virtual device is missing or the
    /// driver is not running; the emitter retries on the next tick.
    fn emit(&self, slot: VirtualSlot, value: f32) -> Result<(), PipelineFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_release_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = DeviceId::from_raw("044f:b687:SN01");

        let lease = ExclusiveLease::new(id.clone(), tx);
        assert_eq!(lease.device(), &id);
        drop(lease);

        assert_eq!(rx.try_recv().ok(), Some(id));
    }

    #[test]
    fn test_lease_drop_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let lease = ExclusiveLease::new(DeviceId::from_raw("x"), tx);
        drop(lease); // must not panic
    }
}
