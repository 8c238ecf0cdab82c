//! Multi-language code execution and grading.
//!
//! A submission flows through the [`queue::AdmissionQueue`], gets its own
//! [`workspace::Workspace`], has a harness synthesized by [`harness`], is run by
//! [`engine::ProcessRunner`] (or [`remote::RemoteRunner`] for remote languages)
//! once per test case, and is judged by [`evaluator`]. [`executor::Engine`] ties
//! these together behind `submit_execution`.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod queue;
pub mod remote;
pub mod workspace;

#[cfg(test)]
mod engine_tests;

pub use error::{EngineError, EngineResult};
pub use executor::Engine;
