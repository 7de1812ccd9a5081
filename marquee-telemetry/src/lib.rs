//! Telemetry initialization for the marquee service binaries.

pub mod tracing;
