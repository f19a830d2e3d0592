//! DCPrism batch worker library.
//!
//! Exposes configuration and the festival run loop so the binary and tests
//! share them.

pub mod config;
pub mod job;

pub use job::{run, RunSummary};
