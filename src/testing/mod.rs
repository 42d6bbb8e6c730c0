//! Differential scenario runner
//!
//! Reads YAML scenarios, sends each step to every environment through a
//! `ProbeClient`, and asserts against the decoded responses rather than
//! fixed literals, since generated IDs make environment-to-environment
//! comparison the only stable oracle.

pub mod assertions;
mod config;
mod runner;
pub mod template;

pub use config::*;
pub use runner::{
    run_scenario, run_scenarios, Failure, FailureKind, RunOptions, RunReport, ScenarioResult,
};
