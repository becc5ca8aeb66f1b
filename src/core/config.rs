//! Configuration management with layered hierarchy

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::batch::{BatchOptions, DEFAULT_FILE_PREFIX};
use crate::document::CellFormat;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 32;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    #[diagnostic(code(docfill::config::io))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    #[diagnostic(
        code(docfill::config::parse),
        help("keys: bind, max_upload_mb, file_prefix, measured_font, measured_size_pt")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("invalid bind address '{value}': {source}")]
    #[diagnostic(code(docfill::config::bind), help("use HOST:PORT, e.g. 127.0.0.1:5000"))]
    Bind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// One layer of settings; unset keys leave the lower layer in place
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    /// Listen address for `docfill serve`
    pub bind: Option<String>,

    /// Largest accepted upload request, in megabytes
    pub max_upload_mb: Option<u64>,

    /// Prepended to the CLR code in output file names
    pub file_prefix: Option<String>,

    pub measured_font: Option<String>,
    pub measured_size_pt: Option<f32>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(contents)
    }
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub max_upload_mb: u64,
    pub file_prefix: String,
    pub measured_font: String,
    pub measured_size_pt: f32,
}

impl Default for Config {
    fn default() -> Self {
        let measured = CellFormat::default();
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            measured_font: measured.font_face,
            measured_size_pt: measured.size_pt,
        }
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// Command-line flags are applied afterwards by the caller via [`Config::merge`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Built-in defaults
        let mut config = Config::default();

        // 2. Global user config (~/.config/docfill/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match ConfigLayer::from_file(&global_path) {
                    Ok(layer) => config.merge(layer),
                    Err(e) => log::warn!("ignoring global config: {e}"),
                }
            }
        }

        // 3. File named with --config
        if let Some(path) = explicit {
            config.merge(ConfigLayer::from_file(path)?);
            log::debug!("loaded config from {}", path.display());
        }

        Ok(config)
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docfill")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge a layer into this config (the layer takes precedence)
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(bind) = layer.bind {
            self.bind = bind;
        }
        if let Some(mb) = layer.max_upload_mb {
            self.max_upload_mb = mb;
        }
        if let Some(prefix) = layer.file_prefix {
            self.file_prefix = prefix;
        }
        if let Some(font) = layer.measured_font {
            self.measured_font = font;
        }
        if let Some(size) = layer.measured_size_pt {
            self.measured_size_pt = size;
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|source| ConfigError::Bind {
            value: self.bind.clone(),
            source,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            file_prefix: self.file_prefix.clone(),
            measured: CellFormat::new(self.measured_font.clone(), self.measured_size_pt),
        }
    }
}
