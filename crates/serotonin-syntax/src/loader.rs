//! Resolves `IMPORT` directives against a library search path (spec §6),
//! turning one entry file into the flat rule set the driver compiles.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serotonin_core::error::{Result, SerotoninError};
use serotonin_core::term::RuleDef;
use tracing::{debug, trace};

use crate::parser::{self, ImportDirective};

/// Search path plus the set of library names already loaded, so a library
/// imported by two different files (or imported twice by one) only
/// contributes its rules once.
pub struct Loader {
    search_path: Vec<PathBuf>,
    loaded: HashSet<String>,
}

impl Loader {
    /// `entry_dir` and its `libraries` subdirectory are searched first, in
    /// that order; `extra_lib_dirs` are appended and searched after them.
    pub fn new(entry_dir: &Path, extra_lib_dirs: &[PathBuf]) -> Self {
        let mut search_path = vec![entry_dir.to_path_buf(), entry_dir.join("libraries")];
        search_path.extend(extra_lib_dirs.iter().cloned());
        Loader { search_path, loaded: HashSet::new() }
    }

    /// Parse `entry_path` and every library it transitively imports,
    /// returning the combined rule set in import-then-definition order.
    pub fn load_entry(&mut self, entry_path: &Path) -> Result<Vec<RuleDef>> {
        let src = std::fs::read_to_string(entry_path).map_err(|e| {
            SerotoninError::parse(format!("cannot read '{}': {e}", entry_path.display()), None)
        })?;
        self.load_source(&src)
    }

    fn load_source(&mut self, src: &str) -> Result<Vec<RuleDef>> {
        let file = parser::parse(src)?;
        let mut rules = Vec::new();
        for import in &file.imports {
            rules.extend(self.load_library(import)?);
        }
        rules.extend(file.rules);
        Ok(rules)
    }

    fn load_library(&mut self, import: &ImportDirective) -> Result<Vec<RuleDef>> {
        if self.loaded.contains(&import.name) {
            trace!(library = %import.name, "already loaded, skipping");
            return Ok(Vec::new());
        }
        let path = self.resolve(&import.name).ok_or_else(|| SerotoninError::UnresolvedImport {
            name: import.name.clone(),
        })?;
        debug!(library = %import.name, path = %path.display(), "loading library");
        self.loaded.insert(import.name.clone());
        let src = std::fs::read_to_string(&path)
            .map_err(|e| SerotoninError::parse(format!("cannot read '{}': {e}", path.display()), None))?;
        self.load_source(&src)
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file_name = format!("{name}.sero");
        self.search_path.iter().map(|dir| dir.join(&file_name)).find(|p| p.is_file())
    }
}
