//! The OpenPedals daemon (`pedald`).
//!
//! Thin shell around [`openpedal_engine`]: loads the service
//! configuration, wires the pipeline to its ports, and runs until asked
//! to stop. With `--simulate` it substitutes a synthetic pedal set and a
//! logging output so the whole pipeline can run on a machine with no
//! hardware attached.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod config;
pub mod daemon;
pub mod sim;

pub use config::ServiceConfig;
pub use daemon::ServiceDaemon;
