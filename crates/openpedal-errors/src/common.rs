//! Severity classification shared by all fault kinds.

/// How bad a fault is from the user's perspective.
///
/// Severity drives how the UI layer presents a fault; it never drives
/// control flow inside the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, no action required.
    Info,
    /// Degraded mode, feature still usable.
    Warning,
    /// Feature lost for one device or axis until it recovers.
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}
