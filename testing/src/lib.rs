//! # CareBridge Testing
//!
//! Testing utilities and helpers for the CareBridge reducer architecture.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - proptest strategies for the inputs auth flows care about
//!
//! ## Example
//!
//! ```ignore
//! use carebridge_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(AuthReducer::new())
//!     .with_env(test_env())
//!     .given_state(AuthState::default())
//!     .when_action(AuthAction::CancelRoleSelection)
//!     .then_state(|s| assert!(s.session.current_profile().is_none()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use carebridge_core::environment::Clock;

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use carebridge_testing::mocks::FixedClock;
    /// use carebridge_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_instant())
    }

    /// The instant [`test_clock`] is pinned to
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Addresses with one `@`, a non-empty local part and a dotted domain
    pub fn valid_email() -> impl Strategy<Value = String> {
        ("[a-z0-9._+-]{1,16}", "[a-z0-9-]{1,12}", "[a-z]{2,6}")
            .prop_map(|(local, host, tld)| format!("{local}@{host}.{tld}"))
    }

    /// Strings that contain no `@` at all
    pub fn missing_at_sign() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9._-]{0,24}"
    }

    /// Every upper/lower-case spelling of `word`, chosen per character
    pub fn case_variants(word: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
            word.chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock, test_instant};
