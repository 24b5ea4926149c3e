//! Conformance harness for portio.
//!
//! This crate provides:
//! - Fixtures: JSON scripts of port operations with expected results
//! - Runner: replays each script against a real port and compares
//! - Structured logging: JSONL run evidence with a validation contract

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod fixtures;
pub mod runner;
pub mod structured_log;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet, Op, PortSetup};
pub use runner::{TestRunner, VerificationResult, VerificationSummary};
