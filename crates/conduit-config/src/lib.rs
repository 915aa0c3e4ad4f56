//! Configuration consumed by the conduit adapter
//!
//! Covers the backend location and credentials, Azure hosting details,
//! request-shaping knobs, and logging.

#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod provider;
pub mod telemetry;

use serde::Deserialize;

pub use provider::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level conduit configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
