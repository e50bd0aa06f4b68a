//! Telemetry: structured logging and access-control counters.
//!
//! - **Logging**: JSON/pretty/compact output through `tracing-subscriber`,
//!   with per-module levels and field-name redaction
//! - **Metrics**: named counters emitted through the `metrics` facade; the
//!   server binary installs a Prometheus recorder, library users may install
//!   their own or none
//!
//! # Example
//!
//! ```rust,no_run
//! use strive_core::telemetry::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, RedactionConfig, SensitiveFieldRedactor};
pub use self::metrics::{
    describe_metrics, install_prometheus, AccessMetrics, AuditMetrics, DenialReason,
};
