//! [`TestProject`] builder for caisson test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Anchor filename, duplicated here so this crate stays dependency-free
/// within the workspace.
const ANCHOR_FILE: &str = ".caisson.yml";

/// A temporary project directory with helper methods for test setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use caisson_test_utils::TestProject;
///
/// let project = TestProject::new();
/// project.write_anchor("image: busybox\n");
/// let subdir = project.mkdirs("src/deep");
/// project.assert_file_exists(".caisson.yml");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary project directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestProject::new: failed to create temp dir"),
        }
    }

    /// Return the root path of the project.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write the `.caisson.yml` anchor file at the project root.
    pub fn write_anchor(&self, contents: &str) {
        self.write_file(ANCHOR_FILE, contents);
    }

    /// Write a file relative to the project root, creating parent
    /// directories as needed.
    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestProject::write_file: mkdir failed");
        }
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("TestProject::write_file: {}: {e}", path.display()));
    }

    /// Create a nested directory chain under the root, returning its path.
    pub fn mkdirs(&self, rel: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(&path)
            .unwrap_or_else(|e| panic!("TestProject::mkdirs: {}: {e}", path.display()));
        path
    }

    /// Assert that `rel` (relative to the project root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, rel: &str) {
        let full_path = self.root().join(rel);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `rel` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, rel: &str, content: &str) {
        let full_path = self.root().join(rel);
        let file_content = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            full_path.display(),
            content,
            file_content
        );
    }
}
