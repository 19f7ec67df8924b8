//! Optional `serotonin.toml` configuration (spec §4.9), layered under
//! whatever flags are given on the command line. Builder-style, the way the
//! teacher's own `compiler::config::CompilerConfig` lets embedding code
//! assemble a config without constructing the struct literal directly.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CliError, Result};

/// Deserialised straight from TOML; every field is optional so a config
/// file only needs to mention what it wants to override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Additional library search directories, tried after the entry file's
    /// own directory and its `libraries/` subdirectory.
    pub lib_dirs: Vec<PathBuf>,
    pub max_steps: Option<u64>,
    pub max_instructions: Option<u64>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| CliError::ConfigRead { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| CliError::ConfigParse { path: path.to_path_buf(), source })
    }

    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dirs.push(dir.into());
        self
    }

    pub fn with_lib_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.lib_dirs.extend(dirs);
        self
    }

    /// Flags passed on the command line win over the file: they extend
    /// `lib_dirs` (searched after whatever the file already listed) and
    /// replace a budget outright when given.
    pub fn overlay(mut self, lib_dirs: Vec<PathBuf>, max_steps: Option<u64>, max_instructions: Option<u64>) -> Self {
        self.lib_dirs.extend(lib_dirs);
        if max_steps.is_some() {
            self.max_steps = max_steps;
        }
        if max_instructions.is_some() {
            self.max_instructions = max_instructions;
        }
        self
    }

    pub fn budgets(&self) -> serotonin_core::Budgets {
        let default = serotonin_core::Budgets::default();
        serotonin_core::Budgets {
            max_steps: self.max_steps.unwrap_or(default.max_steps),
            max_instructions: self.max_instructions.unwrap_or(default.max_instructions),
        }
    }
}
