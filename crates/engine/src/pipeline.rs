//! The running pipeline: tick loops, hot-plug handling, and the control
//! surface for calibration and curve management.
//!
//! Three tasks run for the pipeline's lifetime:
//!
//! - the **watcher** re-enumerates hardware at a slow cadence, reconciles
//!   the registry, and claims/releases exclusivity leases;
//! - the **sampler** reads every connected device once per tick, applies
//!   the current curve table, feeds any active wizard session, and
//!   publishes a live frame;
//! - the **emitter** writes the last-known value of every mapped slot to
//!   the virtual device once per tick.
//!
//! Control operations run on the caller's task. They touch shared state
//! only through short `parking_lot` locks (never held across an await)
//! and the atomic curve-table swap, so a tick in flight is never blocked
//! for longer than a map lookup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use openpedal_curve_store::{CurveCache, CurveStore};
use openpedal_curves::{CalibrationCurve, CurveKind, CurvePreset, PedalAxis};
use openpedal_errors::PipelineFault;
use openpedal_wizard::{CancelReason, WizardSession, WizardState};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::calibration::CalibrationEngine;
use crate::config::PipelineConfig;
use crate::device::{AxisDescriptor, Device, DeviceEvent, DeviceId};
use crate::error::EngineError;
use crate::mapping::{VirtualDeviceMapping, VirtualSlot};
use crate::ports::{DeviceHiderPort, ExclusiveLease, PedalInputPort, VirtualOutputPort};
use crate::registry::DeviceRegistry;

/// One axis reading as seen by the live stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSample {
    /// Device the reading came from.
    pub device: DeviceId,
    /// Axis sampled.
    pub axis: PedalAxis,
    /// Raw hardware value.
    pub raw: f32,
    /// Value after calibration.
    pub normalized: f32,
}

/// All readings from one sampling tick, for UI charting and the wizard's
/// live preview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFrame {
    /// Per-axis readings, every connected device.
    pub samples: Vec<LiveSample>,
}

/// Consumer side of the pipeline's observation channels.
///
/// The live stream is a `watch` channel: a slow consumer sees the newest
/// frame and skips the ones it missed, it never backs up the sampler.
#[derive(Debug)]
pub struct PipelineMonitor {
    live: watch::Receiver<LiveFrame>,
    faults: mpsc::UnboundedReceiver<PipelineFault>,
}

impl PipelineMonitor {
    /// Newest published frame.
    pub fn latest_frame(&self) -> LiveFrame {
        self.live.borrow().clone()
    }

    /// Wait for the next frame. `None` once the pipeline has shut down.
    pub async fn next_frame(&mut self) -> Option<LiveFrame> {
        self.live.changed().await.ok()?;
        Some(self.live.borrow_and_update().clone())
    }

    /// Wait for the next fault. `None` once the pipeline has shut down.
    pub async fn next_fault(&mut self) -> Option<PipelineFault> {
        self.faults.recv().await
    }

    /// Non-blocking fault poll.
    pub fn try_fault(&mut self) -> Option<PipelineFault> {
        self.faults.try_recv().ok()
    }
}

struct HeldValue {
    value: f32,
    sampled_at: Instant,
}

/// State shared between the tick tasks and the control surface.
struct PipelineShared {
    config: PipelineConfig,
    input: Arc<dyn PedalInputPort>,
    hider: Arc<dyn DeviceHiderPort>,
    output: Arc<dyn VirtualOutputPort>,
    registry: Mutex<DeviceRegistry>,
    engine: CalibrationEngine,
    mapping: Mutex<VirtualDeviceMapping>,
    sessions: Mutex<BTreeMap<(DeviceId, PedalAxis), WizardSession>>,
    leases: Mutex<BTreeMap<DeviceId, ExclusiveLease>>,
    latest: Mutex<BTreeMap<VirtualSlot, HeldValue>>,
    cache: Mutex<CurveCache>,
    store: CurveStore,
    live_tx: watch::Sender<LiveFrame>,
    fault_tx: mpsc::UnboundedSender<PipelineFault>,
}

impl PipelineShared {
    fn report(&self, fault: PipelineFault) {
        // Monitor may have been dropped; the pipeline runs regardless.
        let _ = self.fault_tx.send(fault);
    }

    async fn handle_connect(&self, device: Device) {
        self.mapping.lock().bind_defaults(&device);
        if self.config.hide_devices {
            match self.hider.claim(&device.id).await {
                Ok(lease) => {
                    debug!(device = %device.id, "exclusivity lease acquired");
                    self.leases.lock().insert(device.id.clone(), lease);
                }
                Err(fault) => {
                    // Non-fatal: run with the raw device visible.
                    warn!(device = %device.id, %fault, "device hiding unavailable");
                    self.report(fault);
                }
            }
        }
    }

    fn handle_disconnect(&self, id: &DeviceId) {
        // Dropping the lease unhides the device.
        self.leases.lock().remove(id);
        let mut sessions = self.sessions.lock();
        sessions.retain(|key, session| {
            if &key.0 == id {
                session.cancel(CancelReason::DeviceDisconnected);
                false
            } else {
                true
            }
        });
    }

    fn sample_tick(&self) {
        let devices = self.registry.lock().connected();
        // One table snapshot per tick: a curve installed mid-tick applies
        // from the next tick on.
        let table = self.engine.snapshot();
        let now = Instant::now();
        let mut frame = LiveFrame::default();
        let mut failed: Vec<(DeviceId, PipelineFault)> = Vec::new();

        for device in &devices {
            let readings = match self.input.sample(&device.id) {
                Ok(readings) => readings,
                Err(fault) => {
                    failed.push((device.id.clone(), fault));
                    continue;
                }
            };

            for (axis, raw) in readings {
                let Some(descriptor) = device.axis(axis) else {
                    continue;
                };

                {
                    let mut sessions = self.sessions.lock();
                    if let Some(session) = sessions.get_mut(&(device.id.clone(), axis)) {
                        session.observe(raw);
                    }
                }

                let normalized = table.normalize(&device.id, descriptor, raw);
                if let Some(slot) = self.mapping.lock().slot_for(&device.id, axis) {
                    self.latest.lock().insert(
                        slot,
                        HeldValue {
                            value: normalized,
                            sampled_at: now,
                        },
                    );
                }
                frame.samples.push(LiveSample {
                    device: device.id.clone(),
                    axis,
                    raw,
                    normalized,
                });
            }
        }

        for (id, fault) in failed {
            warn!(device = %id, %fault, "sample read failed, marking device disconnected");
            self.registry.lock().mark_disconnected(&id);
            self.handle_disconnect(&id);
            self.report(fault);
        }

        let _ = self.live_tx.send_replace(frame);
    }

    fn emit_tick(&self, output_down: &mut bool) {
        let staleness = self.config.staleness();
        let held: Vec<(VirtualSlot, f32, bool)> = {
            let latest = self.latest.lock();
            latest
                .iter()
                .map(|(slot, h)| (*slot, h.value, h.sampled_at.elapsed() > staleness))
                .collect()
        };

        let mut tick_ok = true;
        for (slot, value, stale) in held {
            if stale {
                // Device gone or sampler stalled: keep writing the last
                // known value rather than dropping the axis to zero.
                trace!(%slot, value, "holding last known value");
            }
            if let Err(fault) = self.output.emit(slot, value) {
                tick_ok = false;
                if !*output_down {
                    warn!(%slot, %fault, "virtual output write failed");
                    self.report(fault);
                }
            }
        }
        // Fault once per outage, not once per tick.
        *output_down = !tick_ok;
    }
}

async fn watcher_loop(shared: Arc<PipelineShared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(shared.config.enumeration_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let devices = match shared.input.enumerate().await {
            Ok(devices) => devices,
            Err(fault) => {
                warn!(%fault, "device enumeration failed");
                shared.report(fault);
                continue;
            }
        };

        let events = shared.registry.lock().sync(devices);
        for event in events {
            match event {
                DeviceEvent::Connected(device) => shared.handle_connect(device).await,
                DeviceEvent::Disconnected(id) => shared.handle_disconnect(&id),
            }
        }
    }
}

async fn sampler_loop(shared: Arc<PipelineShared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(shared.config.sample_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        shared.sample_tick();
    }
}

async fn emitter_loop(shared: Arc<PipelineShared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(shared.config.emit_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut output_down = false;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        shared.emit_tick(&mut output_down);
    }
}

/// Owner of the running pipeline.
///
/// Created with [`PedalPipeline::start`]; all control operations take
/// `&self` and are safe to call from any task. Dropping the pipeline
/// without [`PedalPipeline::shutdown`] stops nothing gracefully — leases
/// still release via `Drop`, but pending curve edits may miss their final
/// save.
pub struct PedalPipeline {
    shared: Arc<PipelineShared>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PedalPipeline {
    /// Load persisted curves, restore them into the engine, and spawn the
    /// tick tasks.
    ///
    /// # Errors
    ///
    /// Fails only on a genuine I/O failure reading the curve cache; a
    /// missing or corrupt cache file starts the pipeline with whatever
    /// loaded cleanly.
    pub async fn start(
        input: Arc<dyn PedalInputPort>,
        hider: Arc<dyn DeviceHiderPort>,
        output: Arc<dyn VirtualOutputPort>,
        config: PipelineConfig,
    ) -> Result<(Self, PipelineMonitor), EngineError> {
        let store = CurveStore::new(&config.cache_path);
        let loaded = store.load().await?;

        let (live_tx, live_rx) = watch::channel(LiveFrame::default());
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        for fault in &loaded.skipped {
            let _ = fault_tx.send(fault.clone());
        }

        // Restore persisted curves in one swap. Devices need not be
        // present yet; a later connect resumes them untouched.
        let engine = CalibrationEngine::new();
        let mut restored = Vec::new();
        for device in loaded.cache.devices() {
            for axis in loaded.cache.axes(device) {
                if let Some(curve) = loaded.cache.get(device, axis) {
                    restored.push((DeviceId::from_raw(device), axis, curve.clone()));
                }
            }
        }
        let restored_count = restored.len();
        engine.install_all(restored);
        info!(curves = restored_count, "calibration curves restored");

        let shared = Arc::new(PipelineShared {
            config,
            input,
            hider,
            output,
            registry: Mutex::new(DeviceRegistry::new()),
            engine,
            mapping: Mutex::new(VirtualDeviceMapping::new()),
            sessions: Mutex::new(BTreeMap::new()),
            leases: Mutex::new(BTreeMap::new()),
            latest: Mutex::new(BTreeMap::new()),
            cache: Mutex::new(loaded.cache),
            store,
            live_tx,
            fault_tx,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(watcher_loop(Arc::clone(&shared), shutdown_rx.clone())),
            tokio::spawn(sampler_loop(Arc::clone(&shared), shutdown_rx.clone())),
            tokio::spawn(emitter_loop(Arc::clone(&shared), shutdown_rx)),
        ];

        Ok((
            Self {
                shared,
                shutdown_tx,
                tasks,
            },
            PipelineMonitor {
                live: live_rx,
                faults: fault_rx,
            },
        ))
    }

    /// Every device the registry has seen, connected or not.
    pub fn devices(&self) -> Vec<Device> {
        self.shared.registry.lock().all()
    }

    /// Currently connected devices.
    pub fn connected_devices(&self) -> Vec<Device> {
        self.shared.registry.lock().connected()
    }

    /// Axes of a device that have a stored curve.
    pub fn stored_axes(&self, device: &DeviceId) -> Vec<PedalAxis> {
        self.shared.cache.lock().axes(device.as_str())
    }

    /// Active curve for an axis, if one is installed.
    pub fn active_curve(&self, device: &DeviceId, axis: PedalAxis) -> Option<CalibrationCurve> {
        self.shared
            .engine
            .snapshot()
            .curve(device, axis)
            .map(|arc| CalibrationCurve::clone(arc))
    }

    /// Bind a physical axis to a virtual slot.
    ///
    /// # Errors
    ///
    /// `UnknownDevice`/`UnknownAxis` for a bad source, `SlotTaken` if the
    /// slot has another active source.
    pub fn bind_slot(
        &self,
        slot: VirtualSlot,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<(), EngineError> {
        self.descriptor(device, axis)?;
        self.shared.mapping.lock().bind(slot, device.clone(), axis)
    }

    /// Release a virtual slot.
    pub fn unbind_slot(&self, slot: VirtualSlot) -> Option<(DeviceId, PedalAxis)> {
        self.shared.mapping.lock().unbind(slot)
    }

    /// Start a calibration session for one axis.
    ///
    /// # Errors
    ///
    /// `SessionActive` if a non-terminal session already runs for the
    /// axis; `UnknownDevice`/`UnknownAxis` for a bad target.
    pub fn start_calibration(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<WizardState, EngineError> {
        let descriptor = self.descriptor(device, axis)?;
        let mut sessions = self.shared.sessions.lock();
        let key = (device.clone(), axis);
        if sessions.get(&key).is_some_and(|s| !s.state().is_terminal()) {
            return Err(EngineError::SessionActive {
                device: device.clone(),
                axis,
            });
        }

        let mut session = WizardSession::new(axis, descriptor.domain);
        if descriptor.centered {
            session = session.centered();
        }
        session.begin()?;
        let state = session.state();
        info!(device = %device, axis = %axis, "calibration session started");
        sessions.insert(key, session);
        Ok(state)
    }

    /// Current state of an axis's calibration session.
    ///
    /// # Errors
    ///
    /// `NoSession` if none exists.
    pub fn calibration_state(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<WizardState, EngineError> {
        self.with_session(device, axis, |s| Ok(s.state()))
    }

    /// Advance the session out of its current capture phase.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn capture_extreme(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<WizardState, EngineError> {
        self.with_session(device, axis, |s| {
            s.capture()?;
            Ok(s.state())
        })
    }

    /// Adjust the session's deadzone width, in raw units.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn set_deadzone(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        width: f32,
    ) -> Result<(), EngineError> {
        self.with_session(device, axis, |s| {
            s.set_deadzone(width)?;
            Ok(())
        })
    }

    /// Choose the curve kind the session will commit.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn set_curve_kind(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        kind: CurveKind,
    ) -> Result<(), EngineError> {
        self.with_session(device, axis, |s| {
            s.set_kind(kind)?;
            Ok(())
        })
    }

    /// Set the session's invert flag.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn set_invert(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        invert: bool,
    ) -> Result<(), EngineError> {
        self.with_session(device, axis, |s| {
            s.set_invert(invert)?;
            Ok(())
        })
    }

    /// Curve the session would commit right now, for live charting.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn preview_curve(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<CalibrationCurve, EngineError> {
        self.with_session(device, axis, |s| s.preview())
    }

    /// Move the session to its final confirmation step.
    ///
    /// # Errors
    ///
    /// Wizard transition errors pass through; `NoSession` if none exists.
    pub fn review_calibration(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<(), EngineError> {
        self.with_session(device, axis, |s| {
            s.review()?;
            Ok(())
        })
    }

    /// Commit the session: validate, install the curve atomically, and
    /// persist it.
    ///
    /// On rejection (degenerate capture, failed validation) the session
    /// survives in `SettingDeadzone` and the previous curve stays active.
    ///
    /// # Errors
    ///
    /// Rejection reasons pass through as wizard errors; `Store` if the
    /// curve installed but could not be persisted.
    pub async fn commit_calibration(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<CalibrationCurve, EngineError> {
        let curve = {
            let mut sessions = self.shared.sessions.lock();
            let key = (device.clone(), axis);
            let session = sessions.get_mut(&key).ok_or_else(|| EngineError::NoSession {
                device: device.clone(),
                axis,
            })?;
            let curve = session.commit()?;
            sessions.remove(&key);
            curve
        };

        self.install_and_persist(device, axis, curve.clone()).await?;
        Ok(curve)
    }

    /// Cancel an axis's calibration session. The previous curve, if any,
    /// stays active.
    ///
    /// # Errors
    ///
    /// `NoSession` if none exists.
    pub fn cancel_calibration(&self, device: &DeviceId, axis: PedalAxis) -> Result<(), EngineError> {
        let mut sessions = self.shared.sessions.lock();
        let mut session =
            sessions
                .remove(&(device.clone(), axis))
                .ok_or_else(|| EngineError::NoSession {
                    device: device.clone(),
                    axis,
                })?;
        session.cancel(CancelReason::UserRequest);
        Ok(())
    }

    /// Install a named preset for an axis, instantiated against the
    /// axis's raw domain, and persist it.
    ///
    /// # Errors
    ///
    /// `UnknownPreset` for a bad name; curve and store errors pass
    /// through.
    pub async fn apply_preset(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        name: &str,
    ) -> Result<CalibrationCurve, EngineError> {
        let descriptor = self.descriptor(device, axis)?;
        let preset = CurvePreset::find(axis, name)
            .ok_or_else(|| EngineError::UnknownPreset(name.to_string()))?;
        let curve = preset.instantiate(descriptor.domain)?;
        self.install_and_persist(device, axis, curve.clone()).await?;
        Ok(curve)
    }

    /// Install a caller-supplied curve for an axis and persist it.
    ///
    /// # Errors
    ///
    /// Validation failures reject the curve before anything changes.
    pub async fn set_curve(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        curve: CalibrationCurve,
    ) -> Result<(), EngineError> {
        self.descriptor(device, axis)?;
        curve.validate()?;
        self.install_and_persist(device, axis, curve).await
    }

    /// Remove an axis's curve, reverting it to the plain rescale.
    ///
    /// # Errors
    ///
    /// `Store` if the removal could not be persisted.
    pub async fn clear_curve(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<bool, EngineError> {
        let removed = self.shared.engine.remove(device, axis);
        let snapshot = {
            let mut cache = self.shared.cache.lock();
            cache.remove(device.as_str(), axis);
            cache.clone()
        };
        self.shared.store.save(&snapshot).await?;
        Ok(removed)
    }

    /// Copy the current cache file into a timestamped backup.
    ///
    /// # Errors
    ///
    /// `Store` on I/O failure.
    pub async fn backup_curves(&self) -> Result<Option<std::path::PathBuf>, EngineError> {
        Ok(self.shared.store.backup().await?)
    }

    /// Orderly shutdown: stop the tick tasks, release every lease, and
    /// flush the curve cache.
    ///
    /// # Errors
    ///
    /// `Store` if the final save fails; leases are released regardless.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        info!("pipeline shutting down");
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }

        // Unhide every device before the process goes away.
        self.shared.leases.lock().clear();

        let snapshot = self.shared.cache.lock().clone();
        self.shared.store.save(&snapshot).await?;
        info!("pipeline stopped");
        Ok(())
    }

    fn descriptor(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
    ) -> Result<AxisDescriptor, EngineError> {
        let registry = self.shared.registry.lock();
        let record = registry
            .get(device)
            .ok_or_else(|| EngineError::UnknownDevice(device.clone()))?;
        record
            .axis(axis)
            .copied()
            .ok_or(EngineError::UnknownAxis {
                device: device.clone(),
                axis,
            })
    }

    fn with_session<T>(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        f: impl FnOnce(&mut WizardSession) -> Result<T, openpedal_wizard::WizardError>,
    ) -> Result<T, EngineError> {
        let mut sessions = self.shared.sessions.lock();
        let session =
            sessions
                .get_mut(&(device.clone(), axis))
                .ok_or_else(|| EngineError::NoSession {
                    device: device.clone(),
                    axis,
                })?;
        Ok(f(session)?)
    }

    async fn install_and_persist(
        &self,
        device: &DeviceId,
        axis: PedalAxis,
        curve: CalibrationCurve,
    ) -> Result<(), EngineError> {
        self.shared.engine.install(device.clone(), axis, curve.clone());
        let snapshot = {
            let mut cache = self.shared.cache.lock();
            cache.insert(device.as_str(), axis, curve);
            cache.clone()
        };
        self.shared.store.save(&snapshot).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PedalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PedalPipeline")
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
