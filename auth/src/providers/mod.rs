//! Authentication providers.
//!
//! This module defines traits for the external collaborators of the auth
//! core: the identity provider, the profile store and the client-local
//! pending-registration cache. These traits enable dependency injection and
//! make the auth logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. Reducers and the
//! reconciliation procedure depend on these traits; the application wires in
//! concrete adapters from [`crate::stores`] (or [`crate::mocks`] in tests).
//!
//! ```text
//! UI event ──▶ IdentityProvider ──▶ reconcile ──▶ SessionState
//!                                     │    │
//!                         ProfileStore ◀┘    └▶ PendingCache
//! ```
//!
//! Every method that touches the network or disk returns a `Send` future so
//! reducers can move adapter clones into spawned effects.

pub mod identity;
pub mod pending;
pub mod profile_store;

// Re-export provider traits
pub use identity::{IdentityProvider, extract_oob_code, is_completion_link};
pub use pending::PendingCache;
pub use profile_store::ProfileStore;
