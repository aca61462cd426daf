//! Convenience re-exports.

pub use crate::common::ErrorSeverity;
pub use crate::fault::PipelineFault;
