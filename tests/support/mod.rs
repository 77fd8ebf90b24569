//! Test support utilities for kvt integration tests.
//!
//! Provides an isolated configuration directory and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;
use tempfile::TempDir;

/// Test environment with its own config file.
///
/// Child processes get `KVT_CONFIG` pointed at the temp directory, so
/// tests never read the user's real configuration and can run in parallel.
pub struct Test {
    pub dir: TempDir,
}

impl Test {
    /// Environment using the memory backend with the built-in demo vaults.
    pub fn new() -> Self {
        Self::with_config(MEMORY_CONFIG)
    }

    /// Environment with the given `config.toml` contents.
    pub fn with_config(contents: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(dir.path().join("config.toml"), contents).expect("failed to write config");
        Self { dir }
    }

    /// Environment with no config file at all.
    pub fn unconfigured() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }
}
