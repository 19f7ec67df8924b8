//! CLI-level error vocabulary: wraps `serotonin_core::SerotoninError` plus
//! the I/O and config-parsing failures that only make sense at this layer,
//! the same split the core crate draws between compilation errors and
//! everything around them.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Compile(#[from] serotonin_core::SerotoninError),
}

pub type Result<T> = std::result::Result<T, CliError>;
