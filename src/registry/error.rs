//! Registry error types
//!
//! Error types for session registry operations. None of these are fatal:
//! callers decide what, if anything, to surface to the user.

use crate::session::SessionKind;

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// No session with the given address in the searched collection(s);
    /// safe to retry after a fresh lookup
    NotFound(String),
    /// Transport creation or negotiation failed; the session stays in its
    /// collection in the failed state
    ActivationFailed(String),
    /// Only video and available-video sessions can move between collections
    NotShiftable(SessionKind),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(addr) => write!(f, "session not found: {}", addr),
            RegistryError::ActivationFailed(addr) => {
                write!(f, "session activation failed: {}", addr)
            }
            RegistryError::NotShiftable(kind) => {
                write!(f, "{} sessions cannot be shifted", kind)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
