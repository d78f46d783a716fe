//! Well-known names shared across the workspace.

/// Anchor configuration file located by upward search.
pub const ANCHOR_FILE: &str = ".caisson.yml";

/// Shell used when the configuration does not name one.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Presence of this variable (value irrelevant) lets discovery cross
/// filesystem mount boundaries.
pub const DISCOVERY_ACROSS_FILESYSTEM_VAR: &str = "CAISSON_DISCOVERY_ACROSS_FILESYSTEM";

/// Tag introducing a cross-document value inclusion.
pub const INCLUDE_TAG: &str = "!from_yaml";
