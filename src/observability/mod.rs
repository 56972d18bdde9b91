//! Observability for validus
//!
//! Structured JSON logging, typed events, and lock-free counters. Log
//! fields carry names, counts, and durations; never raw input values.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, ValidationMetrics};
