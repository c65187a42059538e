//! Shared configuration loader for the cfour toolchain.
//!
//! `defaults/cfour.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`CfourConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub use config::ConfigError as Error;

const DEFAULT_TOML: &str = include_str!("../defaults/cfour.default.toml");

/// File picked up from the working directory when present.
pub const LOCAL_CONFIG: &str = "cfour.toml";

/// Top-level configuration consumed by cfour applications.
#[derive(Debug, Clone, Deserialize)]
pub struct CfourConfig {
    pub programs: ProgramsConfig,
    pub render: RenderConfig,
}

/// Which programs are reported and how deeply they are processed.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramsConfig {
    pub keep_failed: bool,
    pub extract: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub verbosity: u8,
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Provenance,
    Summary,
    Json,
    Yaml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Provenance,
        OutputFormat::Summary,
        OutputFormat::Json,
        OutputFormat::Yaml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Provenance => "provenance",
            OutputFormat::Summary => "summary",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<CfourConfig, ConfigError> {
        let config: CfourConfig = self.builder.build()?.try_deserialize()?;
        if config.render.verbosity > 3 {
            return Err(ConfigError::Message(format!(
                "render.verbosity must be between 0 and 3, got {}",
                config.render.verbosity
            )));
        }
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<CfourConfig, ConfigError> {
    Loader::new().build()
}
