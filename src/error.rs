use thiserror::Error;

/// Protocol-level failures: malformed or truncated driver input. These are
/// fatal, unlike a rejected write or a ghost request, which the
/// orchestrator simply logs and skips.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("malformed protocol input: {0}")]
    Protocol(String),
}
