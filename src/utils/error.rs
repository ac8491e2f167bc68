use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Remote store rejected the update (status {status}){}", reason_suffix(.message))]
    RemoteRejected { status: u16, message: Option<String> },

    #[error("Order invariant violated in course {course_id}: {detail}")]
    InvariantViolation { course_id: String, detail: String },

    #[error("Module {module_id} already has a mutation in flight")]
    MutationInFlight { module_id: String },

    #[error("Index {index} is out of range for a sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Remote,
    Internal,
    Conflict,
    Input,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::NotFound { .. } => ErrorCategory::Lookup,
            SyncError::RemoteRejected { .. } | SyncError::Http(_) => ErrorCategory::Remote,
            SyncError::InvariantViolation { .. } => ErrorCategory::Internal,
            SyncError::MutationInFlight { .. } => ErrorCategory::Conflict,
            SyncError::IndexOutOfRange { .. } => ErrorCategory::Input,
            SyncError::Io(_)
            | SyncError::Serialization(_)
            | SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict => ErrorSeverity::Low,
            ErrorCategory::Lookup | ErrorCategory::Input | ErrorCategory::Remote => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// Reason reported by the remote store, if it sent one.
    pub fn remote_reason(&self) -> Option<&str> {
        match self {
            SyncError::RemoteRejected {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::NotFound { entity, id } => format!("The {entity} '{id}' no longer exists"),
            SyncError::RemoteRejected { .. } | SyncError::Http(_) => match self.remote_reason() {
                Some(reason) => format!("Failed to update module: {reason}"),
                None => "Failed to update module".to_string(),
            },
            SyncError::InvariantViolation { .. } => {
                "Course ordering is inconsistent, reload the page".to_string()
            }
            SyncError::MutationInFlight { .. } => {
                "This module is still being saved, try again in a moment".to_string()
            }
            SyncError::IndexOutOfRange { .. } => "Invalid drop position".to_string(),
            _ => format!("Configuration problem: {self}"),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lookup => "Refresh the course list and retry",
            ErrorCategory::Remote => "Check connectivity to the content API and retry",
            ErrorCategory::Internal => "Run a full refresh from the remote store",
            ErrorCategory::Conflict => "Wait for the pending save to finish",
            ErrorCategory::Input => "Drop the module onto a valid position",
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
        }
    }
}

fn reason_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, SyncError>;
