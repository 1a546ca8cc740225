//! Session entry and lifecycle state machine
//!
//! Tracks one media session from creation through activation, iteration and
//! teardown. The transport connection handle exists exactly while the
//! session is in the [`Active`](SessionPhase::Active) phase.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::transport::{SessionListener, TransportError, TransportFactory, TransportSession};

use super::SessionKind;

/// Opaque stable handle for a session, assigned by the registry
///
/// Never reused within one registry, so a stale handle resolves to nothing
/// instead of a different session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub(crate) u64);

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, never activated
    Uninitialized,
    /// Transport creation/negotiation in progress
    Activating,
    /// Connected; eligible for iteration
    Active,
    /// Explicitly disconnected; may be reactivated
    Deactivated,
    /// Activation failed; kept visible but non-iterable until a new
    /// activation is requested
    Failed,
}

/// One logical media stream bound to a multicast address
pub struct Session {
    id: SessionId,
    address: String,
    kind: SessionKind,
    phase: SessionPhase,

    /// When false the session stays connected but is skipped by the
    /// iteration loop
    processing_enabled: bool,

    /// Pending or applied key; `None` means encryption disabled
    encryption_key: Option<String>,

    /// Owned connection handle, `Some` iff phase is `Active`
    transport: Option<Box<dyn TransportSession>>,

    /// Tick counter handed to the transport for internal ordering,
    /// random-seeded on each activation
    sequence: u32,
}

impl Session {
    pub fn new(id: SessionId, address: impl Into<String>, kind: SessionKind) -> Self {
        Self {
            id,
            address: address.into(),
            kind,
            phase: SessionPhase::Uninitialized,
            processing_enabled: true,
            encryption_key: None,
            transport: None,
            sequence: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Re-key the session into another collection's kind; used when a
    /// session moves between the video and available-video collections.
    pub(crate) fn set_kind(&mut self, kind: SessionKind) {
        self.kind = kind;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the session is connected (owns a transport handle)
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_processing_enabled(&self) -> bool {
        self.processing_enabled
    }

    pub fn set_processing_enabled(&mut self, enabled: bool) {
        self.processing_enabled = enabled;
    }

    pub fn is_encryption_enabled(&self) -> bool {
        self.encryption_key.is_some()
    }

    /// Create and negotiate the transport connection
    ///
    /// On success the session enters `Active` with a freshly seeded
    /// sequence counter and any pending encryption key already applied, so
    /// the key is in force before the first iteration tick. On failure the
    /// session enters `Failed` with no transport handle; it is not retried
    /// automatically.
    pub fn activate(
        &mut self,
        factory: &dyn TransportFactory,
        listener: Arc<dyn SessionListener>,
    ) -> Result<(), TransportError> {
        // one-shot, non-interruptible step
        self.phase = SessionPhase::Activating;

        let mut transport = match factory.create_session(&self.address, listener) {
            Ok(t) => t,
            Err(e) => {
                self.phase = SessionPhase::Failed;
                return Err(e);
            }
        };

        transport.enable_video(!self.kind.is_audio());
        transport.enable_audio(self.kind.is_audio());

        if let Err(e) = transport.initialise() {
            self.phase = SessionPhase::Failed;
            return Err(e);
        }

        if let Some(ref key) = self.encryption_key {
            transport.set_encryption_key(Some(key));
        }

        self.sequence = seed_sequence();
        self.transport = Some(transport);
        self.phase = SessionPhase::Active;
        Ok(())
    }

    /// Drop the transport connection
    ///
    /// The handle is destroyed here, before the session itself can be
    /// dropped or reactivated. No-op when not connected.
    pub fn deactivate(&mut self) {
        if self.transport.take().is_some() {
            self.phase = SessionPhase::Deactivated;
        }
    }

    /// Run one iteration tick if the session is connected and processing
    /// is enabled; returns whether a tick happened.
    ///
    /// A transport error is local to this tick: it is logged and the
    /// session stays in place for the next round.
    pub fn iterate(&mut self) -> bool {
        if !self.processing_enabled {
            return false;
        }
        match self.transport.as_mut() {
            Some(transport) => {
                if let Err(e) = transport.iterate(self.sequence) {
                    tracing::warn!(address = %self.address, error = %e, "session iterate failed");
                }
                self.sequence = self.sequence.wrapping_add(1);
                true
            }
            None => false,
        }
    }

    /// Store `key` and apply it to the live connection if there is one;
    /// otherwise it is applied at the next activation.
    pub fn set_encryption_key(&mut self, key: &str) {
        self.encryption_key = Some(key.to_string());
        if let Some(transport) = self.transport.as_mut() {
            transport.set_encryption_key(Some(key));
        }
    }

    /// Clear the key; a future activation starts unencrypted.
    pub fn disable_encryption(&mut self) {
        self.encryption_key = None;
        if let Some(transport) = self.transport.as_mut() {
            transport.set_encryption_key(None);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("kind", &self.kind)
            .field("phase", &self.phase)
            .field("processing_enabled", &self.processing_enabled)
            .finish()
    }
}

/// Random-ish 32-bit seed for the per-session sequence counter.
/// Simple LCG over the clock; this only needs to differ between
/// activations, not be unpredictable.
fn seed_sequence() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mixed = now
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (mixed >> 32) as u32
}
