//! Shared utilities.
//!
//! Test helpers live here; `testutil` is also exported to integration tests
//! behind the `testutil` feature.

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
