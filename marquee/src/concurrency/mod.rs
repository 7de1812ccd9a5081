//! Concurrency utilities for coordinating the service's long-lived tasks.
//!
//! The HTTP listener, the background scheduler, and the buffered publish worker all
//! run as independent tasks. The [`shutdown`] module gives them one broadcast-based
//! cancellation fabric: a single shutdown signal terminates every subscriber, each
//! subscriber finishes its current unit of work before stopping, and the process
//! exit path waits for all of them through their task handles.

pub mod shutdown;
