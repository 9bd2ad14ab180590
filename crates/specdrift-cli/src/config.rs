//! Optional `specdrift.toml` settings
//!
//! Looked up in the working directory unless `--config` names a file.
//! Command-line flags always win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use specdrift_core::{SurfaceKind, ValidateOptions};

use crate::CliError;

pub const DEFAULT_FILE: &str = "specdrift.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Notation to parse with instead of detecting it
    pub surface: Option<SurfaceKind>,
    pub format: Format,
    /// Extra C3 denylist terms
    pub implementation_terms: Vec<String>,
}

impl Config {
    /// Read `explicit`, else `specdrift.toml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Config, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_FILE);
                if !fallback.is_file() {
                    return Ok(Config::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Config::parse(&text).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// Core options, with `surface` from the command line taking precedence
    pub fn options(&self, surface: Option<SurfaceKind>) -> ValidateOptions {
        ValidateOptions {
            surface: surface.or(self.surface),
            implementation_terms: self.implementation_terms.clone(),
        }
    }

    pub fn json(&self, flag: bool) -> bool {
        flag || self.format == Format::Json
    }
}
