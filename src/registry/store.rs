//! Session registry implementation
//!
//! The central registry owning every session across the three collections,
//! exposing the thread-safe control API and the per-tick iteration driven
//! by the background loop.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::session::{Session, SessionId, SessionKind};
use crate::transport::{SessionListener, TransportFactory};

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::pause::{PauseGuard, PauseSignal};

/// The three session collections plus rotation state
///
/// Insertion order within each collection is the order both lookup-by-address
/// and iteration observe; duplicate addresses resolve to the first match.
struct RegistryState {
    video: Vec<Session>,
    available: Vec<Session>,
    audio: Vec<Session>,

    /// Index of the rotation slot within `available`, `None` when vacated
    rotate_pos: Option<usize>,

    /// Weak back-reference to the most recently rotated-out session;
    /// resolves to nothing once that session leaves the pool
    last_rotated: Option<SessionId>,

    next_id: u64,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            video: Vec::new(),
            available: Vec::new(),
            audio: Vec::new(),
            rotate_pos: None,
            last_rotated: None,
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }

    fn collection(&self, kind: SessionKind) -> &Vec<Session> {
        match kind {
            SessionKind::Video => &self.video,
            SessionKind::AvailableVideo => &self.available,
            SessionKind::Audio => &self.audio,
        }
    }

    fn collection_mut(&mut self, kind: SessionKind) -> &mut Vec<Session> {
        match kind {
            SessionKind::Video => &mut self.video,
            SessionKind::AvailableVideo => &mut self.available,
            SessionKind::Audio => &mut self.audio,
        }
    }

    /// First match by address scanning video, then available-video, then
    /// audio
    fn find(&self, address: &str) -> Option<&Session> {
        self.video
            .iter()
            .chain(self.available.iter())
            .chain(self.audio.iter())
            .find(|s| s.address() == address)
    }

    fn find_mut(&mut self, address: &str) -> Option<&mut Session> {
        self.video
            .iter_mut()
            .chain(self.available.iter_mut())
            .chain(self.audio.iter_mut())
            .find(|s| s.address() == address)
    }

    /// Keep `rotate_pos` pointing at the same session after a pool removal
    /// at `index`; removing the slot itself vacates the position.
    fn adjust_rotate_for_removal(&mut self, index: usize) {
        if let Some(pos) = self.rotate_pos {
            if index <= pos {
                self.rotate_pos = pos.checked_sub(1);
            }
        }
    }
}

/// Central registry for all media sessions
///
/// One mutex guards the three collections and the rotation state. The
/// control path acquires it through [`lock_sessions`](Self::lock_sessions)
/// (which also raises the advisory pause signal); the iteration loop
/// acquires it through [`iterate_all`](Self::iterate_all) without touching
/// the signal.
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    pause: PauseSignal,
    factory: Arc<dyn TransportFactory>,
    video_listener: Arc<dyn SessionListener>,
    audio_listener: Arc<dyn SessionListener>,
    config: RegistryConfig,
}

impl SessionRegistry {
    /// Create a registry with default configuration
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        video_listener: Arc<dyn SessionListener>,
        audio_listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self::with_config(factory, video_listener, audio_listener, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(
        factory: Arc<dyn TransportFactory>,
        video_listener: Arc<dyn SessionListener>,
        audio_listener: Arc<dyn SessionListener>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            state: Mutex::new(RegistryState::new()),
            pause: PauseSignal::new(),
            factory,
            video_listener,
            audio_listener,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Acquire the registry lock for a multi-step atomic sequence
    ///
    /// Raises the pause signal for as long as the guard lives; every
    /// mutation and query is a guard method, so a sequence of calls on one
    /// guard is a single critical section. The lock is not re-entrant:
    /// taking a second guard (or calling a locking wrapper, or
    /// [`iterate_all`](Self::iterate_all)) from the same call stack
    /// deadlocks.
    pub async fn lock_sessions(&self) -> SessionsGuard<'_> {
        let pause = self.pause.raise();
        let state = self.state.lock().await;
        SessionsGuard {
            registry: self,
            state,
            _pause: pause,
        }
    }

    /// Run one iteration tick over every connected, processing-enabled
    /// session; returns whether at least one session ticked.
    ///
    /// Called by the background loop on a steady cadence. When the pause
    /// signal is raised by a control-path burst, yields briefly before
    /// contending on the lock. Must never be called while the same call
    /// stack holds a [`SessionsGuard`].
    pub async fn iterate_all(&self) -> bool {
        if self.pause.is_raised() {
            tokio::time::sleep(self.config.pause_backoff).await;
        }

        // takes the lock without raising pause, so control-path holders
        // read an accurate signal
        let mut state = self.state.lock().await;
        let state = &mut *state;

        let mut had_any = false;
        for session in state
            .video
            .iter_mut()
            .chain(state.available.iter_mut())
            .chain(state.audio.iter_mut())
        {
            had_any |= session.iterate();
        }
        had_any
    }

    /// Spawn the background iteration task
    ///
    /// Drives [`iterate_all`](Self::iterate_all) at `config.tick_interval`.
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_iterate_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.iterate_all().await;
            }
        })
    }

    // Single-call wrappers over a fresh guard. Callers needing several
    // operations in one critical section use `lock_sessions` directly.

    pub async fn add_session(
        &self,
        address: &str,
        kind: SessionKind,
    ) -> Result<SessionId, RegistryError> {
        self.lock_sessions().await.add_session(address, kind)
    }

    pub async fn remove_session(
        &self,
        address: &str,
        kind: SessionKind,
    ) -> Result<(), RegistryError> {
        self.lock_sessions().await.remove_session(address, kind)
    }

    pub async fn rotate(&self, target: Option<&str>) -> Result<(), RegistryError> {
        self.lock_sessions().await.rotate(target)
    }

    pub async fn unrotate(&self) {
        self.lock_sessions().await.unrotate()
    }

    pub async fn shift_session(
        &self,
        address: &str,
        from_kind: SessionKind,
    ) -> Result<(), RegistryError> {
        self.lock_sessions().await.shift_session(address, from_kind)
    }

    pub async fn set_encryption_key(&self, address: &str, key: &str) -> Result<(), RegistryError> {
        self.lock_sessions().await.set_encryption_key(address, key)
    }

    pub async fn disable_encryption(&self, address: &str) -> Result<(), RegistryError> {
        self.lock_sessions().await.disable_encryption(address)
    }

    pub async fn set_processing_enabled(
        &self,
        address: &str,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.lock_sessions().await.set_processing_enabled(address, enabled)
    }

    pub async fn session_count(&self, kind: SessionKind) -> usize {
        self.lock_sessions().await.session_count(kind)
    }

    pub async fn is_session_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.lock_sessions().await.is_session_enabled(address)
    }

    pub async fn is_processing_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.lock_sessions().await.is_processing_enabled(address)
    }

    pub async fn is_encryption_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.lock_sessions().await.is_encryption_enabled(address)
    }

    pub async fn current_rotate_address(&self) -> Option<String> {
        self.lock_sessions().await.current_rotate_address()
    }

    pub async fn last_rotated_address(&self) -> Option<String> {
        self.lock_sessions().await.last_rotated_address()
    }

    pub async fn rotate_position(&self) -> Option<usize> {
        self.lock_sessions().await.rotate_position()
    }
}

/// Scoped, exclusive access to the registry's collections
///
/// Dropping the guard releases the lock and then lowers the pause signal.
pub struct SessionsGuard<'a> {
    registry: &'a SessionRegistry,
    state: MutexGuard<'a, RegistryState>,
    _pause: PauseGuard<'a>,
}

impl SessionsGuard<'_> {
    /// Construct a session and append it to `kind`'s collection
    ///
    /// Video and audio sessions are activated immediately; available-video
    /// sessions wait in the pool until rotated to. On activation failure
    /// the entry stays in the collection, failed and inert, and the error
    /// is returned.
    pub fn add_session(
        &mut self,
        address: &str,
        kind: SessionKind,
    ) -> Result<SessionId, RegistryError> {
        let registry = self.registry;
        let id = self.state.allocate_id();
        let mut session = Session::new(id, address, kind);

        let result = if kind == SessionKind::AvailableVideo {
            Ok(())
        } else {
            activate_session(registry, &mut session)
        };

        tracing::info!(address = %address, kind = %kind, "session added");
        self.state.collection_mut(kind).push(session);
        result.map(|_| id)
    }

    /// Remove the first session matching `address` within `kind`'s
    /// collection, deactivating it first
    pub fn remove_session(
        &mut self,
        address: &str,
        kind: SessionKind,
    ) -> Result<(), RegistryError> {
        let index = self
            .state
            .collection(kind)
            .iter()
            .position(|s| s.address() == address)
            .ok_or_else(|| {
                tracing::warn!(address = %address, kind = %kind, "remove: session not found");
                RegistryError::NotFound(address.to_string())
            })?;

        // the index adjustment must share this critical section with the
        // removal, so no interleaved rotate observes a stale position
        if kind == SessionKind::AvailableVideo {
            self.state.adjust_rotate_for_removal(index);
        }

        let mut session = self.state.collection_mut(kind).remove(index);
        session.deactivate();
        tracing::info!(address = %address, kind = %kind, "session removed");
        Ok(())
    }

    /// Advance the rotation slot within the available-video pool
    ///
    /// With no target the position advances circularly; with a target
    /// address the position seeks to it directly (`NotFound` leaves the
    /// rotation state untouched). The previously active pool session is
    /// deactivated before the new one is activated; rotating a
    /// single-element pool onto itself leaves the connection alone. No-op
    /// on an empty pool.
    pub fn rotate(&mut self, target: Option<&str>) -> Result<(), RegistryError> {
        let registry = self.registry;
        let state = &mut *self.state;

        if state.available.is_empty() {
            return Ok(());
        }

        let prev_pos = state.rotate_pos;
        let prev_id = prev_pos.and_then(|p| state.available.get(p)).map(|s| s.id());

        let new_pos = match target {
            Some(addr) => state
                .available
                .iter()
                .position(|s| s.address() == addr)
                .ok_or_else(|| {
                    tracing::warn!(address = %addr, "rotate: session not in pool");
                    RegistryError::NotFound(addr.to_string())
                })?,
            None => match prev_pos {
                Some(pos) => (pos + 1) % state.available.len(),
                None => 0,
            },
        };

        if let Some(id) = prev_id {
            state.last_rotated = Some(id);
        }
        state.rotate_pos = Some(new_pos);
        let new_id = state.available[new_pos].id();

        match prev_id {
            Some(prev) if prev != new_id => {
                if let Some(old) = state.available.iter_mut().find(|s| s.id() == prev) {
                    old.deactivate();
                }
                activate_session(registry, &mut state.available[new_pos])?;
            }
            // very first rotation: nothing to deactivate
            None => {
                activate_session(registry, &mut state.available[new_pos])?;
            }
            // same slot; wrap-around is idempotent
            Some(_) => {}
        }

        tracing::info!(
            address = %state.available[new_pos].address(),
            position = new_pos,
            "rotated"
        );
        Ok(())
    }

    /// Vacate the rotation slot entirely: deactivate whatever occupies it,
    /// reset the position and clear the last-rotated reference
    pub fn unrotate(&mut self) {
        let state = &mut *self.state;
        if let Some(pos) = state.rotate_pos {
            if let Some(session) = state.available.get_mut(pos) {
                session.deactivate();
                tracing::info!(address = %session.address(), "unrotated");
            }
        }
        state.rotate_pos = None;
        state.last_rotated = None;
    }

    /// Move a session between the video and available-video collections,
    /// preserving its identity and respecting the destination's activation
    /// policy (immediate for video, pool-based for available-video)
    pub fn shift_session(
        &mut self,
        address: &str,
        from_kind: SessionKind,
    ) -> Result<(), RegistryError> {
        let registry = self.registry;
        let state = &mut *self.state;

        match from_kind {
            SessionKind::Video => {
                let index = state
                    .video
                    .iter()
                    .position(|s| s.address() == address)
                    .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
                let mut session = state.video.remove(index);
                // only the rotation slot may be active in the pool
                session.deactivate();
                session.set_kind(SessionKind::AvailableVideo);
                tracing::info!(address = %address, "session shifted to pool");
                state.available.push(session);
                Ok(())
            }
            SessionKind::AvailableVideo => {
                let index = state
                    .available
                    .iter()
                    .position(|s| s.address() == address)
                    .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
                state.adjust_rotate_for_removal(index);
                let mut session = state.available.remove(index);
                session.set_kind(SessionKind::Video);
                // a slot-active session keeps its live connection across
                // the move; anything else activates now
                let result = if session.is_enabled() {
                    Ok(())
                } else {
                    activate_session(registry, &mut session)
                };
                tracing::info!(address = %address, "session shifted to video");
                state.video.push(session);
                result
            }
            SessionKind::Audio => Err(RegistryError::NotShiftable(SessionKind::Audio)),
        }
    }

    /// Set the encryption key on the first session matching `address`
    /// (scanning video, available-video, audio in order)
    pub fn set_encryption_key(&mut self, address: &str, key: &str) -> Result<(), RegistryError> {
        let session = self
            .state
            .find_mut(address)
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
        session.set_encryption_key(key);
        tracing::info!(address = %address, "encryption key set");
        Ok(())
    }

    /// Clear the encryption key on the first session matching `address`
    pub fn disable_encryption(&mut self, address: &str) -> Result<(), RegistryError> {
        let session = self
            .state
            .find_mut(address)
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
        session.disable_encryption();
        tracing::info!(address = %address, "encryption disabled");
        Ok(())
    }

    /// Toggle iteration processing for the first session matching `address`
    /// without touching its connection
    pub fn set_processing_enabled(
        &mut self,
        address: &str,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        let session = self
            .state
            .find_mut(address)
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))?;
        session.set_processing_enabled(enabled);
        Ok(())
    }

    /// Number of sessions currently in `kind`'s collection, inert entries
    /// included
    pub fn session_count(&self, kind: SessionKind) -> usize {
        self.state.collection(kind).len()
    }

    /// Whether the first session matching `address` is connected
    pub fn is_session_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.state
            .find(address)
            .map(|s| s.is_enabled())
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    pub fn is_processing_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.state
            .find(address)
            .map(|s| s.is_processing_enabled())
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    pub fn is_encryption_enabled(&self, address: &str) -> Result<bool, RegistryError> {
        self.state
            .find(address)
            .map(|s| s.is_encryption_enabled())
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    /// Address at the current rotation slot, if one is occupied
    pub fn current_rotate_address(&self) -> Option<String> {
        self.state
            .rotate_pos
            .and_then(|pos| self.state.available.get(pos))
            .map(|s| s.address().to_string())
    }

    /// Address of the most recently rotated-out session, while it is still
    /// in the pool
    pub fn last_rotated_address(&self) -> Option<String> {
        self.state.last_rotated.and_then(|id| {
            self.state
                .available
                .iter()
                .find(|s| s.id() == id)
                .map(|s| s.address().to_string())
        })
    }

    /// Current rotation slot index within the pool
    pub fn rotate_position(&self) -> Option<usize> {
        self.state.rotate_pos
    }
}

/// Activate `session` against the registry's factory and the listener for
/// its kind, mapping the transport error and logging either way
fn activate_session(
    registry: &SessionRegistry,
    session: &mut Session,
) -> Result<(), RegistryError> {
    let listener = if session.kind().is_audio() {
        Arc::clone(&registry.audio_listener)
    } else {
        Arc::clone(&registry.video_listener)
    };

    match session.activate(registry.factory.as_ref(), listener) {
        Ok(()) => {
            tracing::info!(
                address = %session.address(),
                kind = %session.kind(),
                "session activated"
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                address = %session.address(),
                kind = %session.kind(),
                error = %e,
                "session activation failed"
            );
            Err(RegistryError::ActivationFailed(session.address().to_string()))
        }
    }
}
