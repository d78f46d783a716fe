//! Error types for caisson-launch

use std::path::PathBuf;

/// Result type for caisson-launch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling or running a container invocation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration engine failure
    #[error(transparent)]
    Config(#[from] caisson_config::Error),

    /// Environment variable registered twice on one invocation
    #[error("environment variable {name} registered twice on this invocation")]
    DuplicateEnv { name: String },

    /// Staging or other filesystem failure
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caisson-init helper binary could not be located
    #[error("caisson-init not found at {} (set CAISSON_INIT_BINARY to override)", .path.display())]
    InitNotFound { path: PathBuf },

    /// `docker` could not be executed at all
    #[error("failed to run docker: {source}")]
    DockerSpawn {
        #[source]
        source: std::io::Error,
    },

    /// `docker inspect` failed for the named image
    #[error("docker inspect failed for {image}: {message}")]
    Inspect { image: String, message: String },

    /// Image metadata could not be decoded
    #[error("unreadable docker inspect output: {0}")]
    InspectDecode(#[from] serde_json::Error),

    /// No passwd entry for the invoking user
    #[error("no passwd entry for uid {uid}")]
    UnknownUser { uid: u32 },

    /// No group entry for the invoking group
    #[error("no group entry for gid {gid}")]
    UnknownGroup { gid: u32 },

    /// No command given and the image defines no default command
    #[error("no command given and image {image} specifies no default command")]
    NoCommand { image: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
