//! # skyvoice-observability
//!
//! Observability-Crate fuer skyvoice:
//! - Prometheus-kompatible Metriken der Sprecher-Pipeline
//! - Structured Logging (Text oder JSON) via tracing-subscriber

pub mod logging;
pub mod metrics;

pub use logging::logging_initialisieren;
pub use metrics::VoiceMetrics;
