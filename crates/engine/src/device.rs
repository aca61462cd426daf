//! Physical pedal device identity and description.

use openpedal_curves::{PedalAxis, RawDomain};
use serde::{Deserialize, Serialize};

/// Stable hardware identity: `vendor:product:serial`.
///
/// Survives reconnects, so a device that unplugs and returns resumes its
/// prior calibration without a new wizard run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Identity from USB vendor/product IDs and a serial string.
    pub fn new(vendor_id: u16, product_id: u16, serial: &str) -> Self {
        Self(format!("{vendor_id:04x}:{product_id:04x}:{serial}"))
    }

    /// Identity from an already-formatted string (persistence key).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identity string, used as the curve cache key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection state tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Device present and sampleable.
    Connected,
    /// Device seen before but currently gone; its curves are retained.
    Disconnected,
}

/// One axis a device exposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDescriptor {
    /// Logical axis name.
    pub axis: PedalAxis,
    /// Raw-value domain the hardware reports for this axis.
    pub domain: RawDomain,
    /// Centered axis: normalized output in `[-1, 1]`.
    pub centered: bool,
}

impl AxisDescriptor {
    /// Non-centered axis over a raw domain.
    pub fn new(axis: PedalAxis, domain: RawDomain) -> Self {
        Self {
            axis,
            domain,
            centered: false,
        }
    }
}

/// A physical pedal device as seen by the registry.
///
/// Only the Device Registry mutates these; everyone else receives clones
/// or reads through the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Stable identity.
    pub id: DeviceId,
    /// Human-readable product name.
    pub name: String,
    /// Axes the hardware exposes.
    pub axes: Vec<AxisDescriptor>,
    /// Current connection state.
    pub state: ConnectionState,
}

impl Device {
    /// A connected device with the given axes.
    pub fn new(id: DeviceId, name: impl Into<String>, axes: Vec<AxisDescriptor>) -> Self {
        Self {
            id,
            name: name.into(),
            axes,
            state: ConnectionState::Connected,
        }
    }

    /// A standard three-pedal set over the full 16-bit domain.
    pub fn standard_pedals(id: DeviceId, name: impl Into<String>) -> Self {
        Self::new(
            id,
            name,
            vec![
                AxisDescriptor::new(PedalAxis::Throttle, RawDomain::FULL_16BIT),
                AxisDescriptor::new(PedalAxis::Brake, RawDomain::FULL_16BIT),
                AxisDescriptor::new(PedalAxis::Clutch, RawDomain::FULL_16BIT),
            ],
        )
    }

    /// Descriptor for one of this device's axes.
    pub fn axis(&self, axis: PedalAxis) -> Option<&AxisDescriptor> {
        self.axes.iter().find(|d| d.axis == axis)
    }

    /// Whether the device is currently sampleable.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Plug/unplug events emitted by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Device appeared (first sight or reconnect).
    Connected(Device),
    /// Device went away; identity retained for resume.
    Disconnected(DeviceId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_format() {
        let id = DeviceId::new(0x044f, 0xb687, "SN01");
        assert_eq!(id.as_str(), "044f:b687:SN01");
        assert_eq!(id, DeviceId::from_raw("044f:b687:SN01"));
    }

    #[test]
    fn test_standard_pedals_axes() {
        let device = Device::standard_pedals(DeviceId::new(1, 2, "x"), "Test Pedals");
        assert_eq!(device.axes.len(), 3);
        assert!(device.axis(PedalAxis::Brake).is_some());
        assert!(device.axis(PedalAxis::Handbrake).is_none());
        assert!(device.is_connected());
    }

    #[test]
    fn test_device_id_serializes_as_plain_string() {
        let id = DeviceId::new(0x044f, 0xb687, "SN01");
        let json = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(json, "\"044f:b687:SN01\"");
    }
}
