//! Error types for caisson-config

use std::path::PathBuf;

use crate::constants::{ANCHOR_FILE, DISCOVERY_ACROSS_FILESYSTEM_VAR, INCLUDE_TAG};

/// Result type for caisson-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering, loading, or resolving
/// configuration.
///
/// Configuration errors are deterministic: none are transient and none are
/// retried. Every failure aborts resolution with one descriptive message; a
/// partial result is never returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Anchor file absent all the way up the directory hierarchy
    #[error("{ANCHOR_FILE} not found here or in any parent directory")]
    ConfigNotFound,

    /// Upward search stopped at a mount point without the escape toggle
    #[error(
        "{ANCHOR_FILE} not found here or in any parent up to mount point {}; \
         stopping at filesystem boundary ({DISCOVERY_ACROSS_FILESYSTEM_VAR} not set)",
        .path.display()
    )]
    FilesystemBoundary { path: PathBuf },

    /// A configuration document could not be read
    #[error("error opening {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying document syntax was invalid
    #[error("error loading {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// The document carried a tag this loader refuses to construct
    #[error("{}: unsupported tag {tag}", .path.display())]
    ForbiddenTag { path: PathBuf, tag: String },

    /// Inclusion directive was not a scalar node
    #[error("{}: {INCLUDE_TAG} directive must be a scalar", .path.display())]
    IncludeScalar { path: PathBuf },

    /// Inclusion directive did not have exactly two arguments
    #[error("{}: {INCLUDE_TAG} expects two arguments, got {found}", .path.display())]
    IncludeArity { path: PathBuf, found: usize },

    /// Inclusion target file could not be resolved
    #[error("{}: cannot include {target}: {source}", .path.display())]
    IncludeTarget {
        path: PathBuf,
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Inclusion chain came back around to a document still being loaded
    #[error("circular {INCLUDE_TAG} inclusion of {}", .path.display())]
    IncludeCycle { path: PathBuf },

    /// Referenced key path missing from the included document
    #[error("key \"{key}\" not found in {target}")]
    IncludeKey { key: String, target: String },

    /// Top-level document was not a mapping
    #[error("{ANCHOR_FILE} must be a mapping, not {actual}")]
    TopLevelShape { actual: &'static str },

    /// Unrecognized top-level keys in the anchor file
    #[error("{}", unrecognized_nodes(.keys))]
    UnrecognizedKeys { keys: Vec<String> },

    /// Alias names double as command words; whitespace would break lookup
    #[error("alias name {name:?} must not contain whitespace")]
    AliasNameWhitespace { name: String },

    /// Alias table keys must be plain strings
    #[error("alias names must be strings, not {actual}")]
    AliasNameType { actual: &'static str },

    /// Script node was not one of the accepted shapes
    #[error("{name}: must be a string or a mapping")]
    ScriptShape { name: String },

    /// Mapping-form script node without a usable `script` subkey
    #[error("{name}: must have a 'script' subkey")]
    ScriptMissing { name: String },

    /// `script` value was not a string or list of strings
    #[error("{name}.script: must be a string or a list of strings")]
    ScriptValue { name: String },

    /// Environment node was neither a mapping nor a list
    #[error("'{name}' must be a list or mapping, not {actual}")]
    EnvironmentShape { name: String, actual: &'static str },

    /// Environment entry that cannot be turned into a KEY/VALUE pair
    #[error("'{name}': invalid environment entry: {entry}")]
    EnvironmentEntry { name: String, entry: String },

    /// A node that must be a mapping held something else
    #[error("'{name}' must be a mapping, not {actual}")]
    MappingExpected { name: String, actual: &'static str },

    /// A node that must be a string held something else
    #[error("'{name}' must be a string, not {actual}")]
    StringExpected { name: String, actual: &'static str },

    /// A node that must be a boolean held something else
    #[error("'{name}' must be a boolean, not {actual}")]
    BoolExpected { name: String, actual: &'static str },

    /// No image from the configuration, a matched alias, or the call site
    #[error("top-level 'image' not set in {ANCHOR_FILE}")]
    ImageNotSet,

    /// Multi-line alias bodies are fixed and cannot absorb extra arguments
    #[error("additional arguments are not allowed with multi-line aliases")]
    MultilineAliasArgs,

    /// Command tokens contained a byte that cannot be shell-quoted
    #[error("command cannot be represented as a shell line")]
    Quote,
}

/// All offending top-level keys in one message, pluralized correctly.
fn unrecognized_nodes(keys: &[String]) -> String {
    let plural = if keys.len() > 1 { "s" } else { "" };
    format!("{ANCHOR_FILE}: unrecognized node{plural}: {}", keys.join(", "))
}
