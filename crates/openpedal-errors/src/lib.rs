//! Error taxonomy for the OpenPedals pipeline.
//!
//! Every fault in the pedal pipeline degrades a single device, axis, or
//! feature. Nothing in this taxonomy is permitted to terminate the process:
//! callers mark the affected unit as unavailable, surface the fault to the
//! UI layer, and keep the rest of the pipeline running.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod common;
pub mod fault;
pub mod prelude;

pub use common::ErrorSeverity;
pub use fault::PipelineFault;
