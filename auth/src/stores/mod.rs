//! Concrete adapters for the auth providers.
//!
//! - **Identity Toolkit** (REST) - email links, Google ID-token exchange
//! - **Firestore** (REST) - profile documents
//! - **File cache** - pending registration on disk, survives a reload
//! - **Memory cache** - pending registration in process memory

pub mod file_pending;
pub mod firestore;
pub mod identity_toolkit;
pub mod memory_pending;

// Re-exports
pub use file_pending::FilePendingCache;
pub use firestore::FirestoreProfileStore;
pub use identity_toolkit::{IdTokenSource, IdentityToolkitProvider, SignedInUser, StaticIdToken};
pub use memory_pending::MemoryPendingCache;
