//! Device registry: the single owner of device records.

use std::collections::BTreeMap;

use tracing::info;

use crate::device::{ConnectionState, Device, DeviceEvent, DeviceId};

/// Tracks every pedal device ever seen this run, keyed by stable identity.
///
/// Re-enumeration is diff-based and idempotent: syncing the same device
/// list twice produces no events. Disconnected devices stay registered so
/// their calibration resumes on reconnect.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
}

impl DeviceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the registry with a fresh enumeration result.
    ///
    /// Returns one event per actual state change: `Connected` for devices
    /// newly present (first sight or reconnect), `Disconnected` for known
    /// connected devices missing from the list.
    pub fn sync(&mut self, enumerated: Vec<Device>) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        let present: Vec<DeviceId> = enumerated.iter().map(|d| d.id.clone()).collect();

        for mut device in enumerated {
            device.state = ConnectionState::Connected;
            let changed = match self.devices.get(&device.id) {
                Some(known) => !known.is_connected(),
                None => true,
            };
            if changed {
                info!(device = %device.id, name = %device.name, "device connected");
                events.push(DeviceEvent::Connected(device.clone()));
            }
            self.devices.insert(device.id.clone(), device);
        }

        for (id, device) in &mut self.devices {
            if device.is_connected() && !present.contains(id) {
                device.state = ConnectionState::Disconnected;
                info!(device = %id, "device disconnected");
                events.push(DeviceEvent::Disconnected(id.clone()));
            }
        }

        events
    }

    /// Mark one device disconnected outside of a sync, e.g. after a failed
    /// sample read. Returns the event if the state actually changed.
    pub fn mark_disconnected(&mut self, id: &DeviceId) -> Option<DeviceEvent> {
        let device = self.devices.get_mut(id)?;
        if !device.is_connected() {
            return None;
        }
        device.state = ConnectionState::Disconnected;
        info!(device = %id, "device disconnected");
        Some(DeviceEvent::Disconnected(id.clone()))
    }

    /// Look up a device record.
    pub fn get(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// All currently connected devices.
    pub fn connected(&self) -> Vec<Device> {
        self.devices
            .values()
            .filter(|d| d.is_connected())
            .cloned()
            .collect()
    }

    /// Every device ever seen, connected or not.
    pub fn all(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedals(n: u16) -> Device {
        Device::standard_pedals(DeviceId::new(0x044f, n, "SN"), format!("Pedals {n}"))
    }

    #[test]
    fn test_first_sync_connects_everything() {
        let mut registry = DeviceRegistry::new();
        let events = registry.sync(vec![pedals(1), pedals(2)]);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, DeviceEvent::Connected(_))));
        assert_eq!(registry.connected().len(), 2);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut registry = DeviceRegistry::new();
        registry.sync(vec![pedals(1)]);
        let events = registry.sync(vec![pedals(1)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_missing_device_disconnects_and_stays_registered() {
        let mut registry = DeviceRegistry::new();
        registry.sync(vec![pedals(1), pedals(2)]);

        let events = registry.sync(vec![pedals(1)]);
        assert_eq!(events, vec![DeviceEvent::Disconnected(pedals(2).id)]);
        assert_eq!(registry.connected().len(), 1);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_reconnect_emits_connected_again() {
        let mut registry = DeviceRegistry::new();
        registry.sync(vec![pedals(1)]);
        registry.sync(vec![]);

        let events = registry.sync(vec![pedals(1)]);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DeviceEvent::Connected(d) if d.id == pedals(1).id));
    }

    #[test]
    fn test_mark_disconnected_once() {
        let mut registry = DeviceRegistry::new();
        registry.sync(vec![pedals(1)]);

        let id = pedals(1).id;
        assert!(registry.mark_disconnected(&id).is_some());
        assert!(registry.mark_disconnected(&id).is_none());
        assert!(registry.mark_disconnected(&DeviceId::from_raw("nope")).is_none());
    }
}
