//! Per-session lifecycle
//!
//! A [`Session`] is one logical media stream bound to a multicast address.
//! It owns the transport connection handle while active and tracks the
//! lifecycle state machine:
//!
//! ```text
//! Uninitialized -> Activating -> Active -> Deactivated
//!                      |                       |
//!                      v                       v
//!                    Failed  ------------> Activating (reactivation)
//! ```

pub mod entry;

pub use entry::{Session, SessionId, SessionPhase};

/// Which registry collection a session belongs to, and therefore which
/// listener it binds to and how activation is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Video session, activated immediately on add
    Video,
    /// Member of the rotation pool; at most one is active at a time
    AvailableVideo,
    /// Audio session, activated immediately on add
    Audio,
}

impl SessionKind {
    /// Whether sessions of this kind carry audio payloads
    pub fn is_audio(&self) -> bool {
        matches!(self, SessionKind::Audio)
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Video => write!(f, "video"),
            SessionKind::AvailableVideo => write!(f, "available-video"),
            SessionKind::Audio => write!(f, "audio"),
        }
    }
}
