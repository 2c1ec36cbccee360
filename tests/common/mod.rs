//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub const ROOT_SCHEMA: &str = "version: 1\nschemas:\n- id: root\n  parent: root\n";

/// Create a vault directory holding `root.md`, `root.schema.yml` and `files`.
///
/// Returns the path to the vault directory (e.g. `<temp_dir>/vault/`).
#[allow(dead_code)]
pub fn create_test_vault(temp_dir: &TempDir, files: &[(&str, &str)]) -> PathBuf {
    init_logging();
    let vault = temp_dir.path().join("vault");
    std::fs::create_dir(&vault).unwrap();

    let root = r#"---
id: root
title: Root
---
# Root

Everything hangs off here.
"#;
    std::fs::write(vault.join("root.md"), root).unwrap();
    std::fs::write(vault.join("root.schema.yml"), ROOT_SCHEMA).unwrap();
    for (name, text) in files {
        std::fs::write(vault.join(name), text).unwrap();
    }
    vault
}
