use thiserror::Error;

/// Problems with a generation request. These are caught before any solving starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no courses selected for scheduling")]
    EmptyCourseSet,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unknown course: {0}")]
    UnknownCourse(String),

    #[error("no rooms available for scheduling")]
    NoRooms,

    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),
}

/// Problems loading startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
