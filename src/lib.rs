//! dbx-runner - run a SQL statement on Databricks with fallback across execution APIs.
//!
//! This library exposes the core modules for use in integration tests.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod poll;
pub mod remote;
pub mod request;
pub mod result;
pub mod strategy;

pub use error::{Result, RunnerError};
pub use orchestrator::{AttemptOutcome, AttemptRecord, Orchestrator, RunReport};
