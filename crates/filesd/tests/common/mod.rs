//! Shared test utilities for filesd integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated scans against a temp directory
//! - Builders for writing target files programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
