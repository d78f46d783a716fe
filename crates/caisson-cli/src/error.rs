//! Error handling and exit statuses for the caisson binary.
//!
//! Failure classes map to documented, distinct exit statuses so wrapping
//! scripts can tell them apart from the container's own exit code:
//! - configuration errors (discovery, parsing, validation): [`EXIT_CONFIG`]
//! - docker/launch failures: [`EXIT_LAUNCH`]
//! - no command produced (none given, image has no default): [`EXIT_NO_COMMAND`]

/// Exit status for configuration errors.
pub const EXIT_CONFIG: i32 = 128;
/// Exit status for docker and launcher failures.
pub const EXIT_LAUNCH: i32 = 2;
/// Exit status when no command could be produced.
pub const EXIT_NO_COMMAND: i32 = 125;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from caisson-launch (configuration errors arrive wrapped)
    #[error(transparent)]
    Launch(#[from] caisson_launch::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// The documented exit status for this failure.
    pub fn exit_status(&self) -> i32 {
        match self {
            CliError::Launch(caisson_launch::Error::Config(_)) => EXIT_CONFIG,
            CliError::Launch(caisson_launch::Error::NoCommand { .. }) => EXIT_NO_COMMAND,
            CliError::Launch(_) => EXIT_LAUNCH,
            CliError::User { .. } => EXIT_CONFIG,
        }
    }
}
