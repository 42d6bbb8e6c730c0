//! Parity Probe - differential testing of two API deployments
//!
//! This library sends the same HTTP requests to several deployments of one
//! REST API (typically dev and release) and asserts that they answer alike.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod common;
pub mod probe;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Config, Environment, Error, Result};
pub use probe::{ProbeClient, ProbeRequest, ProbeResponse};
