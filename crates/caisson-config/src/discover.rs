//! Upward discovery of the anchor configuration file.

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::{ANCHOR_FILE, DISCOVERY_ACROSS_FILESYSTEM_VAR};
use crate::error::{Error, Result};

/// Where the anchor file was found.
///
/// Invariant: `root` is the starting directory or one of its ancestors, and
/// `root.join(&rel)` reconstructs the starting directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Directory containing the anchor file.
    pub root: PathBuf,
    /// Path from `root` back down to the starting directory; empty when the
    /// anchor sits in the starting directory itself.
    pub rel: PathBuf,
}

impl Discovery {
    /// A discovery pinned to `dir` with no descent, used when the anchor is
    /// taken as given rather than searched for.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            root: dir.into(),
            rel: PathBuf::new(),
        }
    }

    /// Absolute path of the anchor file itself.
    pub fn anchor_path(&self) -> PathBuf {
        self.root.join(ANCHOR_FILE)
    }
}

/// Locates the anchor file by walking up from a starting directory.
///
/// The search stops at filesystem mount boundaries unless crossing was
/// enabled, either explicitly or through the
/// `CAISSON_DISCOVERY_ACROSS_FILESYSTEM` environment toggle (its presence
/// enables crossing; its value is ignored).
pub struct AnchorLocator {
    cross_filesystem: bool,
    boundary: Box<dyn Fn(&Path) -> bool>,
}

impl AnchorLocator {
    /// Build a locator with an explicit boundary-crossing policy.
    pub fn new(cross_filesystem: bool) -> Self {
        Self {
            cross_filesystem,
            boundary: Box::new(is_mount_point),
        }
    }

    /// Build a locator honoring the process environment's discovery toggle.
    pub fn from_env() -> Self {
        Self::new(env::var_os(DISCOVERY_ACROSS_FILESYSTEM_VAR).is_some())
    }

    /// Replace the mount-point predicate.
    ///
    /// Only useful for testing, where a real mount boundary cannot be
    /// conjured inside a temporary directory.
    pub fn with_boundary_check(mut self, boundary: impl Fn(&Path) -> bool + 'static) -> Self {
        self.boundary = Box::new(boundary);
        self
    }

    /// Locate the anchor starting from the current working directory.
    pub fn locate(&self) -> Result<Discovery> {
        let start = env::current_dir().map_err(|e| Error::Open {
            path: PathBuf::from("."),
            source: e,
        })?;
        self.locate_from(&start)
    }

    /// Walk upward from `start` until the anchor file is found.
    pub fn locate_from(&self, start: &Path) -> Result<Discovery> {
        let mut dir = start.to_path_buf();
        let mut rel = PathBuf::new();

        loop {
            if dir.join(ANCHOR_FILE).is_file() {
                tracing::debug!(root = %dir.display(), rel = %rel.display(), "anchor found");
                return Ok(Discovery { root: dir, rel });
            }

            if !self.cross_filesystem && (self.boundary)(&dir) {
                return Err(Error::FilesystemBoundary { path: dir });
            }

            let Some(parent) = dir.parent() else {
                return Err(Error::ConfigNotFound);
            };
            if parent.as_os_str().is_empty() || parent == dir {
                return Err(Error::ConfigNotFound);
            }

            // Accumulate the consumed component so root + rel leads back to
            // the starting directory.
            if let Some(consumed) = dir.file_name() {
                rel = if rel.as_os_str().is_empty() {
                    PathBuf::from(consumed)
                } else {
                    Path::new(consumed).join(&rel)
                };
            }
            dir = parent.to_path_buf();
            tracing::debug!(dir = %dir.display(), "anchor not found, ascending");
        }
    }
}

/// Whether `path` is the root of a mounted filesystem.
///
/// `lstat` semantics: a symlink is never a mount point; a directory is one
/// when its device differs from its parent's, or when it shares the parent's
/// inode (the root of the filesystem is its own parent).
#[cfg(unix)]
fn is_mount_point(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if meta.file_type().is_symlink() {
        return false;
    }
    let Ok(parent_meta) = std::fs::symlink_metadata(path.join("..")) else {
        return false;
    };
    meta.dev() != parent_meta.dev() || meta.ino() == parent_meta.ino()
}

#[cfg(not(unix))]
fn is_mount_point(_path: &Path) -> bool {
    false
}
