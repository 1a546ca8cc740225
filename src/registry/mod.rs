//! Session registry
//!
//! The registry owns every session across three ordered collections and
//! serializes all access to them behind one lock.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!                  ┌────────────────────────────┐
//!                  │ state: Mutex<              │
//!                  │   video:     Vec<Session>  │
//!                  │   available: Vec<Session>  │   rotation pool:
//!                  │   audio:     Vec<Session>  │   <= 1 active at a time
//!                  │   rotate_pos, last_rotated │
//!                  │ >                          │
//!                  │ pause: PauseSignal         │
//!                  └──────────────┬─────────────┘
//!                                 │
//!              ┌──────────────────┴──────────────────┐
//!              │                                     │
//!              ▼                                     ▼
//!       [control path]                     [background loop]
//!       lock_sessions() ──► guard ops      iterate_all() each tick
//!       (raises pause while held)          (yields briefly when paused)
//! ```
//!
//! # Lock discipline
//!
//! Every mutation is a method on [`SessionsGuard`], acquired through
//! [`SessionRegistry::lock_sessions`]; the guard is the critical section.
//! The per-call async wrappers on the registry lock once per operation.
//! The lock is not re-entrant, so nothing that already holds a guard may
//! call back into a locking entry point.

pub mod config;
pub mod error;
pub mod pause;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use pause::{PauseGuard, PauseSignal};
pub use store::{SessionRegistry, SessionsGuard};
