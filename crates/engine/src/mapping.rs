//! Binding of physical axes to virtual joystick slots.

use std::collections::BTreeMap;

use openpedal_curves::PedalAxis;
use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceId};
use crate::error::EngineError;

/// One axis slot on the virtual joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualSlot(pub u8);

impl std::fmt::Display for VirtualSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Default slot layout for pedal axes.
pub fn default_slot(axis: PedalAxis) -> VirtualSlot {
    match axis {
        PedalAxis::Throttle => VirtualSlot(0),
        PedalAxis::Brake => VirtualSlot(1),
        PedalAxis::Clutch => VirtualSlot(2),
        PedalAxis::Handbrake => VirtualSlot(3),
    }
}

/// Which physical axis feeds which virtual slot.
///
/// Many physical axes may map to distinct slots; each slot has at most
/// one active source. The mapping survives disconnects so a returning
/// device resumes its slots.
#[derive(Debug, Clone, Default)]
pub struct VirtualDeviceMapping {
    slots: BTreeMap<VirtualSlot, (DeviceId, PedalAxis)>,
}

impl VirtualDeviceMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a physical axis to a slot.
    ///
    /// Rebinding the same source to its existing slot is a no-op.
    ///
    /// # Errors
    ///
    /// `SlotTaken` when the slot already has a different source.
    pub fn bind(
        &mut self,
        slot: VirtualSlot,
        device: DeviceId,
        axis: PedalAxis,
    ) -> Result<(), EngineError> {
        match self.slots.get(&slot) {
            Some((d, a)) if *d == device && *a == axis => Ok(()),
            Some(_) => Err(EngineError::SlotTaken(slot)),
            None => {
                self.slots.insert(slot, (device, axis));
                Ok(())
            }
        }
    }

    /// Bind every axis of a device to its default slot, skipping slots
    /// already owned by another device.
    pub fn bind_defaults(&mut self, device: &Device) {
        for descriptor in &device.axes {
            // A taken slot is not an error here: the first device to show
            // up keeps it.
            let _ = self.bind(
                default_slot(descriptor.axis),
                device.id.clone(),
                descriptor.axis,
            );
        }
    }

    /// Remove a slot binding.
    pub fn unbind(&mut self, slot: VirtualSlot) -> Option<(DeviceId, PedalAxis)> {
        self.slots.remove(&slot)
    }

    /// Source currently feeding a slot.
    pub fn source(&self, slot: VirtualSlot) -> Option<&(DeviceId, PedalAxis)> {
        self.slots.get(&slot)
    }

    /// Slot a physical axis is bound to.
    pub fn slot_for(&self, device: &DeviceId, axis: PedalAxis) -> Option<VirtualSlot> {
        self.slots
            .iter()
            .find(|(_, (d, a))| d == device && *a == axis)
            .map(|(slot, _)| *slot)
    }

    /// All bindings, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (VirtualSlot, &(DeviceId, PedalAxis))> {
        self.slots.iter().map(|(slot, source)| (*slot, source))
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots are bound.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
