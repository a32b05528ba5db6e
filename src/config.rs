//! Configuration loading
//!
//! Layers, lowest priority first: embedded defaults, `~/.lidco/config.yaml`,
//! `<project>/.lidco/config.yaml`, an explicit `--config` file, then
//! `LIDCO_*` environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use lidco_core::LidcoConfig;
use std::path::{Path, PathBuf};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Config files consulted for a project, in load order
pub fn config_files(project_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(".lidco").join("config.yaml"));
    }
    files.push(project_dir.join(".lidco").join("config.yaml"));
    files
}

/// Load configuration for a project
pub fn load_config(project_dir: &Path, explicit: Option<&Path>) -> Result<LidcoConfig> {
    let mut builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    for path in config_files(project_dir) {
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(false));
    }
    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path.to_path_buf()).required(true));
    }

    // prefix_separator("_") so LIDCO_LLM__X works with a single underscore
    let config = builder
        .add_source(
            Environment::with_prefix("LIDCO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
