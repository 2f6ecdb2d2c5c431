/// Stack Sync Error Types
#[derive(Debug, thiserror::Error)]
pub enum StackSyncError {
    /// A git invocation could not be spawned or exited unsuccessfully
    #[error("Git error: `git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// Repository discovery errors
    #[error("Repository error: {0}")]
    Repository(#[from] git2::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Branch errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Interactive prompt errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StackSyncError {
    pub fn git<C: Into<String>, S: Into<String>>(command: C, stderr: S) -> Self {
        StackSyncError::Git {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        StackSyncError::Config(msg.into())
    }

    pub fn branch<S: Into<String>>(msg: S) -> Self {
        StackSyncError::Branch(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        StackSyncError::Validation(msg.into())
    }
}

impl From<dialoguer::Error> for StackSyncError {
    fn from(err: dialoguer::Error) -> Self {
        StackSyncError::Prompt(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StackSyncError>;
