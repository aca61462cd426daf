//! The OpenPedals pipeline engine.
//!
//! Owns the full path from raw pedal hardware to the virtual joystick:
//!
//! ```text
//! Device Registry → Sampler → Calibration Engine → Virtual Output Emitter
//!                     ↑  ↓ (raw stream during calibration)
//!                 Calibration Wizard      Curve Store ⇄ Calibration Engine
//! ```
//!
//! The Device Hider brackets the whole pipeline's active lifetime: while a
//! lease is held, the raw device is invisible to other consumers and only
//! the virtual device shows.
//!
//! Hardware access happens through the port traits in [`ports`]; the
//! engine never talks to a driver directly. All pipeline state lives in an
//! explicitly owned [`pipeline::PedalPipeline`] context — no ambient
//! singletons.
//!
//! # Concurrency model
//!
//! One task drives sampling ticks, one drives emission ticks, and a third
//! re-enumerates devices at a slow cadence. Control operations (wizard,
//! curve CRUD) run on the caller's context and interact with the tick
//! loops only through the atomic curve-table swap and short, non-tick
//! locks. No lock is held across a full tick.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod ports;
pub mod prelude;
pub mod registry;
pub mod testing;

pub use calibration::{CalibrationEngine, CurveTable};
pub use config::PipelineConfig;
pub use device::{AxisDescriptor, ConnectionState, Device, DeviceEvent, DeviceId};
pub use error::EngineError;
pub use mapping::{VirtualDeviceMapping, VirtualSlot};
pub use pipeline::{LiveFrame, LiveSample, PedalPipeline, PipelineMonitor};
pub use ports::{AxisReadings, DeviceHiderPort, ExclusiveLease, PedalInputPort, VirtualOutputPort};
pub use registry::DeviceRegistry;
