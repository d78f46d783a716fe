//! Per-run staging directory for generated files.
//!
//! Ancillary files (the command script, hook scripts, and the caisson-init
//! helper) are written to a temporary host directory that is bind-mounted
//! into the container at a fixed path. The directory is removed when the
//! [`StagingDir`] is dropped, after the container has exited.

use std::fs;
use std::path::{Path, PathBuf};

use caisson_config::HookPhase;
use tempfile::TempDir;

use crate::error::{Error, Result};

/// Fixed container-side path of the staging directory.
pub const STAGING_CONTAINER_DIR: &str = "/.caisson";

/// A temporary host directory mirrored into the container.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    pub fn create() -> Result<Self> {
        let dir = TempDir::with_prefix("caisson")
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        Ok(Self { dir })
    }

    /// Host-side path of the staging directory.
    pub fn host_path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the user command script; returns its container path.
    ///
    /// The script runs under the resolved shell via an explicit interpreter,
    /// so it carries no shebang of its own.
    pub fn write_command_script(&self, lines: &[String]) -> Result<PathBuf> {
        self.write_script("command.sh", None, lines)
    }

    /// Write one hook script; returns its container path.
    pub fn write_hook_script(
        &self,
        phase: HookPhase,
        shell: &str,
        lines: &[String],
    ) -> Result<PathBuf> {
        self.write_script(&format!("hooks/{phase}.sh"), Some(shell), lines)
    }

    fn write_script(&self, name: &str, shebang: Option<&str>, lines: &[String]) -> Result<PathBuf> {
        let host = self.dir.path().join(name);
        if let Some(parent) = host.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut body = String::new();
        if let Some(shell) = shebang {
            body.push_str(&format!("#!{shell}\n"));
        }
        body.push_str("# Generated by caisson\n");
        body.push_str("set -e\n");
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        fs::write(&host, body).map_err(|e| Error::io(&host, e))?;

        Ok(Path::new(STAGING_CONTAINER_DIR).join(name))
    }

    /// Copy a file into the staging directory, permissions included;
    /// returns its container path.
    pub fn stage_file(&self, name: &str, source: &Path) -> Result<PathBuf> {
        let dest = self.dir.path().join(name);
        fs::copy(source, &dest).map_err(|e| Error::io(source, e))?;
        Ok(Path::new(STAGING_CONTAINER_DIR).join(name))
    }
}
