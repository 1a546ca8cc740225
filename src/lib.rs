//! Multicast media session core
//!
//! Lifecycle, rotation and level-metering for a dynamic set of live
//! RTP audio/video sessions, as consumed by a visualization client.
//!
//! Two threads of control meet here: a background loop pumping protocol
//! I/O for every connected session via [`SessionRegistry::iterate_all`],
//! and a control path mutating the session set (add, remove, rotate,
//! encrypt, pause processing) through the same registry's locked API.
//! The registry owns all [`Session`] objects across three collections --
//! active video, an available-video rotation pool keeping at most one
//! member connected at a time, and active audio.
//!
//! Media decode and transport are not implemented here: sessions drive an
//! external transport layer through the traits in [`transport`], and the
//! [`AudioRegistry`] is fed level data back through the transport's
//! listener callbacks.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcast_sessions::{AudioRegistry, SessionKind, SessionRegistry};
//! # use mcast_sessions::transport::{SessionListener, TransportFactory};
//! # async fn demo(factory: Arc<dyn TransportFactory>, video: Arc<dyn SessionListener>) {
//! let audio = Arc::new(AudioRegistry::new());
//! let registry = Arc::new(SessionRegistry::new(factory, video, audio.clone()));
//!
//! registry.spawn_iterate_task();
//! registry.add_session("224.2.0.1/5004", SessionKind::Video).await.unwrap();
//! registry.add_session("224.2.0.2/5004", SessionKind::AvailableVideo).await.unwrap();
//! registry.rotate(None).await.unwrap();
//! # }
//! ```

pub mod audio;
pub mod registry;
pub mod session;
pub mod transport;

pub use audio::{AudioLevelSource, AudioMeter, AudioRegistry, LevelFilter, NO_MATCH_LEVEL};
pub use registry::{RegistryConfig, RegistryError, SessionRegistry, SessionsGuard};
pub use session::{Session, SessionId, SessionKind, SessionPhase};
pub use transport::{
    LabelKind, MediaCapability, SessionListener, StreamId, TransportError, TransportFactory,
    TransportSession,
};
