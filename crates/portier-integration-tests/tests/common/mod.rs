//! Shared helpers for integration tests.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use portier_config::{Config, ResolvedConfig};
use tempfile::TempDir;

/// Generous upper bound for anything the dispatch thread has to do.
#[allow(dead_code)]
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// A temporary `~/.portier` directory holding a user `config.toml`.
#[allow(dead_code)]
pub struct ConfigHome {
    dir: TempDir,
}

#[allow(dead_code)]
impl ConfigHome {
    /// Create the directory with `user_config` as its `config.toml`.
    pub fn with_user_config(user_config: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), user_config).unwrap();
        Self { dir }
    }

    /// Path of the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `name` inside the directory and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Load the layered configuration with this directory as the user layer.
    pub fn load(&self, explicit_file: Option<&Path>) -> ResolvedConfig {
        Config::load_with_home(explicit_file, self.path()).unwrap()
    }
}
