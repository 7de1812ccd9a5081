//! Shared configuration types for the marquee service.

mod base;
mod event_log;
mod scheduler;

pub use base::ValidationError;
pub use event_log::{EventLogConfig, NatsEventLogConfig, PublishMode};
pub use scheduler::SchedulerConfig;
