use std::env as stdenv;
use std::path::{Path, PathBuf};

/// State carried between iterations of the command loop.
///
/// - `current_dir`: the directory every relative path is resolved against.
/// - `should_exit`: raised by `exit` so the loop knows when to stop.
///
/// Fields are public to keep construction in tests trivial.
#[derive(Debug, Clone)]
pub struct Session {
    /// Absolute path of the shell's working directory.
    pub current_dir: PathBuf,
    /// When set to true, the interactive loop terminates after the current line.
    pub should_exit: bool,
}

impl Session {
    /// Capture the process's starting working directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::at(current_dir)
    }

    /// Start a session rooted at `dir` without touching the process state.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: dir.into(),
            should_exit: false,
        }
    }

    /// Resolve a user supplied name against `current_dir`.
    ///
    /// Absolute names are returned unchanged.
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(name)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
