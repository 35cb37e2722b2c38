//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests. Each mock records the calls made to
//! it and can be told to fail.

pub mod identity;
pub mod pending;
pub mod profile_store;

pub use identity::MockIdentityProvider;
pub use pending::MockPendingCache;
pub use profile_store::MockProfileStore;
