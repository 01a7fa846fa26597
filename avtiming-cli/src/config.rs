use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stream_timing::AnalysisConfig;

use crate::cli::OutputFormat;

const APP_NAME: &str = "avtiming";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: OutputFormat,

    /// Default request timeout in seconds
    pub default_timeout: u64,

    /// Enable colored output
    pub colored_output: bool,

    /// Analysis tunables: validation threshold and method, rate window,
    /// sync base and basis
    pub analysis: AnalysisConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: OutputFormat::Pretty,
            default_timeout: 30,
            colored_output: true,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or from the default location
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Use confy for default location
                confy::load(APP_NAME, None).context("Failed to load configuration")
            }
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_timing::{DurationMethod, SyncBasis};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avtiming.toml");
        std::fs::write(
            &path,
            r#"
default_output_format = "json"

[analysis.validation]
threshold_ms = 5.0
method = "dts-span"

[analysis.sync]
basis = "dts"
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_output_format, OutputFormat::Json);
        assert!(config.colored_output);
        assert_eq!(config.analysis.validation.threshold_ms, 5.0);
        assert_eq!(config.analysis.validation.method, DurationMethod::DtsSpan);
        assert_eq!(config.analysis.sync.basis, SyncBasis::Dts);
        assert_eq!(config.analysis.rate.window_seconds, 1.0);
    }

    #[test]
    fn test_save_reset_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("avtiming.toml");

        let mut config = AppConfig::default();
        config.colored_output = false;
        config.analysis.rate.window_seconds = 2.0;
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), config);

        AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "default_timeout = \"soon\"").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
