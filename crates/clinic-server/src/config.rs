//! Server configuration: TOML file, `CLINIC_*` environment overrides, validation.
//!
//! Every key has a default, so the server starts without a config file.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [storage]
//! database_path = "clinic.db"
//!
//! [export]
//! enabled = true
//! path = "clinic.csv"
//!
//! [certificate]
//! template_path = "templates/certificate.docx"
//! font_family = "Times New Roman"
//! font_size_pt = 12.0
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub certificate: CertificateConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("clinic.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Rebuild the CSV mirror after every write
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("clinic.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    /// `.docx` template; the built-in layout is used when unset
    pub template_path: Option<PathBuf>,
    pub font_family: String,
    pub font_size_pt: f32,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            font_family: "Times New Roman".to_string(),
            font_size_pt: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ClinicConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind '{}': {}", self.server.bind, e)))
    }

    /// Check the configuration for values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.storage.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.database_path is empty".into()));
        }
        if self.export.enabled && self.export.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("export.path is empty".into()));
        }
        if let Some(path) = &self.certificate.template_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("certificate.template_path is empty".into()));
            }
        }
        if self.certificate.font_family.trim().is_empty() {
            return Err(ConfigError::Invalid("certificate.font_family is empty".into()));
        }
        let size = self.certificate.font_size_pt;
        if !(size > 0.0 && size <= 96.0) {
            return Err(ConfigError::Invalid(format!(
                "certificate.font_size_pt must be in (0, 96], got {}",
                size
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Invalid(format!("logging.level '{}'", other))),
        }
    }
}

/// Where the base configuration came from, before environment overrides.
///
/// Loading happens before logging is installed, so the caller reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file was absent; every value starts at its default
    Defaults(PathBuf),
}

/// Load configuration.
///
/// 1. Reads `path` if it exists (a missing file means all defaults)
/// 2. Applies `CLINIC_<SECTION>_<KEY>` environment overrides
/// 3. Validates the result
pub fn load_config(path: impl AsRef<Path>) -> Result<(ClinicConfig, ConfigSource), ConfigError> {
    let path = path.as_ref();

    let (mut config, source) = if path.exists() {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        (
            ClinicConfig::from_toml(&contents)?,
            ConfigSource::File(path.to_path_buf()),
        )
    } else {
        (ClinicConfig::default(), ConfigSource::Defaults(path.to_path_buf()))
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    Ok((config, source))
}

/// Apply `CLINIC_*` overrides, reading variables through `lookup`.
pub fn apply_env_overrides<F>(config: &mut ClinicConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Server
    if let Some(val) = lookup("CLINIC_SERVER_BIND") {
        config.server.bind = val;
    }

    // Storage
    if let Some(val) = lookup("CLINIC_STORAGE_DATABASE_PATH") {
        config.storage.database_path = PathBuf::from(val);
    }

    // Export
    if let Some(val) = lookup("CLINIC_EXPORT_ENABLED") {
        config.export.enabled = parse_override("CLINIC_EXPORT_ENABLED", val)?;
    }
    if let Some(val) = lookup("CLINIC_EXPORT_PATH") {
        config.export.path = PathBuf::from(val);
    }

    // Certificate
    if let Some(val) = lookup("CLINIC_CERTIFICATE_TEMPLATE_PATH") {
        config.certificate.template_path = (!val.is_empty()).then(|| PathBuf::from(val));
    }
    if let Some(val) = lookup("CLINIC_CERTIFICATE_FONT_FAMILY") {
        config.certificate.font_family = val;
    }
    if let Some(val) = lookup("CLINIC_CERTIFICATE_FONT_SIZE_PT") {
        config.certificate.font_size_pt = parse_override("CLINIC_CERTIFICATE_FONT_SIZE_PT", val)?;
    }

    // Logging
    if let Some(val) = lookup("CLINIC_LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("CLINIC_LOGGING_JSON") {
        config.logging.json = parse_override("CLINIC_LOGGING_JSON", val)?;
    }

    Ok(())
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}
