pub mod concurrency;
pub mod eventlog;
pub mod publish;
pub mod runtime;
pub mod scheduler;
