//! Scratch files for configuration tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A file in the system temp dir, removed on drop.
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Write `contents` to a fresh file whose name ends with `suffix`.
    pub fn with_contents(suffix: &str, contents: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "jwt-gate-test-{}-{n}-{suffix}",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("Failed to write temp file");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path as a string, for embedding in configuration text.
    pub fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
