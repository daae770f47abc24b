//! Shared test utilities for FrameAssist.
//!
//! This crate provides deterministic collaborator implementations and
//! fixture builders to reduce duplication across the test suite.
//!
//! # Modules
//!
//! - [`clock`] - A manually advanced [`clock::FakeClock`]
//! - [`mock`] - Recording governor and fixed boost policies
//! - [`fixtures`] - Topology and assistant builders
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! frameassist-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use frameassist_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod clock;
pub mod fixtures;
pub mod mock;
pub mod prelude;
