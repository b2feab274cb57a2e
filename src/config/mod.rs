//! Configuration management for `folio.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section.rs   # [preview] [backend]
//! ├── error.rs     # ConfigError
//! ├── util.rs      # config file lookup
//! └── mod.rs       # FolioConfig (this file)
//! ```
//!
//! The file is optional. Without one every section takes its defaults.
//! Command-line flags override values from the file.

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{BackendConfig, PreviewConfig};
use util::{expand_tilde, find_config_file};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG_NAME};
use crate::log;
use crate::preview::PreviewOptions;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing folio.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Absolute path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl FolioConfig {
    /// Load configuration for the given command line.
    ///
    /// Searches upward from cwd for the config file. A missing default
    /// file means defaults; a missing file named with `-C` is an error.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let config_name = expand_tilde(&cli.config);

        let mut config = match find_config_file(&cwd, &config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                crate::debug!("config"; "loaded {}", path.display());
                config.config_path = Some(path);
                config
            }
            None if config_name != Path::new(DEFAULT_CONFIG_NAME) => {
                bail!("Config file '{}' not found", cli.config.display());
            }
            None => Self::default(),
        };

        config.apply_command_options(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Apply command-line overrides.
    fn apply_command_options(&mut self, cli: &Cli) {
        let (args, debounce) = match &cli.command {
            Commands::Preview { args, .. } | Commands::Export { args, .. } => (args, None),
            Commands::Watch { args, debounce } => (args, debounce.as_ref()),
        };

        Self::update_option(&mut self.backend.typst, args.typst.as_ref());
        Self::update_option(&mut self.backend.ppi, args.ppi.as_ref());
        Self::update_option(&mut self.backend.timeout_ms, args.timeout.as_ref());
        Self::update_option(&mut self.preview.debounce_ms, debounce);
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if self.backend.ppi == 0 {
            problems.push("`backend.ppi` must be greater than 0");
        }
        if self.backend.timeout_ms == 0 {
            problems.push("`backend.timeout_ms` must be greater than 0");
        }
        if self.preview.cache_capacity == 0 {
            problems.push("`preview.cache_capacity` must be greater than 0");
        }
        if self.backend.typst.trim().is_empty() {
            problems.push("`backend.typst` must not be empty");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }

    /// Engine options derived from `[backend]` and `[preview]`.
    pub fn preview_options(&self) -> PreviewOptions {
        PreviewOptions {
            timeout: self.backend.timeout(),
            cache_capacity: self.preview.cache_capacity,
        }
    }
}
