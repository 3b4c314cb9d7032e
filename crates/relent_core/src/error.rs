#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    /// Malformed creation or edit input.
    #[error("validation_error - {0}")]
    Validation(String),
    /// Operation referenced a task id that does not exist.
    #[error("not_found - {0}")]
    NotFound(String),
    /// The task-parsing collaborator could not produce a draft.
    #[error("parse_failure - {0}")]
    Parse(String),
    /// A notification sink refused or failed to deliver. Never surfaced past the notifier.
    #[error("delivery_failure - {0}")]
    Delivery(String),
    /// Persisted data or configuration could not be understood.
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse(message.into())
    }

    pub fn delivery<M: Into<String>>(message: M) -> Self {
        Self::Delivery(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Parse(_) => "parse_failure",
            Self::Delivery(_) => "delivery_failure",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Parse(message)
            | Self::Delivery(message)
            | Self::InvalidData(message)
            | Self::Io(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
