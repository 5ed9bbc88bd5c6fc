use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleViolation {
    #[error("interval amount {0} is negative")]
    NegativeInterval(i64),

    #[error("restricted window start {start} is not before stop {stop}")]
    InvertedWindow { start: NaiveTime, stop: NaiveTime },

    #[error("execution time is out of the supported calendar range")]
    OutOfRange,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("log {log_id} cannot be scheduled: {source}")]
    NotSchedulable {
        log_id: i64,
        #[source]
        source: ScheduleViolation,
    },

    #[error("log {log_id} was not processed by the dispatcher")]
    LogNotProcessed { log_id: i64 },

    #[error("log {log_id} was reported as both passed and failed")]
    LogPassedAndFailed { log_id: i64 },

    #[error("dispatching event {event_id} failed: {reason}")]
    Dispatch { event_id: i64, reason: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
