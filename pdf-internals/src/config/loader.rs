//! Configuration loading from files and environment variables.

use std::path::Path;

use config::{Config, Environment, File, FileFormat, FileSourceFile};

use crate::error::{InspectError, InspectResult};
use crate::images::check_dpi;

use super::AppConfig;

/// Base name of the optional config file in the working directory.
const CONFIG_FILE: &str = "pdf-internals";

/// Prefix for environment overrides, e.g. `PDF_INTERNALS__IMAGES__DPI=150`.
const ENV_PREFIX: &str = "PDF_INTERNALS";

/// Load configuration from `pdf-internals.{toml,yaml,json}` if present, then
/// environment variables.
pub fn load_config() -> InspectResult<AppConfig> {
    build(File::with_name(CONFIG_FILE).required(false))
}

/// Load configuration from an explicit file, then environment variables.
pub fn load_config_file(path: &Path) -> InspectResult<AppConfig> {
    build(File::from(path).required(true))
}

fn build(file: File<FileSourceFile, FileFormat>) -> InspectResult<AppConfig> {
    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| InspectError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| InspectError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
        .and_then(validate)
}

fn validate(config: AppConfig) -> InspectResult<AppConfig> {
    check_dpi(config.images.dpi).map_err(|message| InspectError::Config {
        message: format!("images.dpi: {}", message),
    })?;
    Ok(config)
}
