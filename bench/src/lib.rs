//! velox build service load generator
//!
//! This crate exports the generator, scheduler and reporting components so
//! the binary and integration tests share one implementation.

pub mod check;
pub mod config;
pub mod generator;
pub mod hooks;
pub mod payload;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod stats;
pub mod threshold;
pub mod transport;

// Re-export commonly used types
pub use check::CheckResult;
pub use config::{Config, ConfigError};
pub use generator::{Generator, IterationOutcome};
pub use payload::{BuildRequest, PlatformSpec, PluginRef, RequestTemplate};
pub use report::Report;
pub use runner::{RunResult, Runner};
pub use scenario::Scenario;
pub use stats::RunMetrics;
pub use transport::{HttpTransport, Transport};
