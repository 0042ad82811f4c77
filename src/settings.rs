//! # Settings Module
//!
//! ## Purpose
//! Keeps the user-adjustable parameters of StoichKit in one JSON file instead of constants
//! spread over the code: output precision, formula parsing policy, numeric parameters of the
//! balancer and the log level of the binary.
//!
//! ## Architecture
//! - **Settings**: serializable configuration structure
//! - **SettingsManager**: loads, validates and persists a `Settings` value
//! - **Configuration File**: JSON-based persistent storage (stoichkit_config.json)
//!
//! ## Configuration Format
//! ```json
//! {
//!   "decimal_places": 3,
//!   "strict_parsing": false,
//!   "pivot_tolerance": 1e-10,
//!   "precision_scale": 1000000.0,
//!   "show_calculation_steps": true,
//!   "log_level": "info"
//! }
//! ```
//! Missing fields take their default values, a missing file means default settings.
//!
//! ## Usage
//! ```rust
//! use StoichKit::settings::SettingsManager;
//! use StoichKit::Equations::balancer::Balancer;
//!
//! let manager = SettingsManager::new();
//! let balancer = Balancer::with_options(manager.settings().balancer_options());
//! ```
use crate::Equations::balancer::{BalancerOptions, PIVOT_TOLERANCE, PRECISION_SCALE};
use crate::Equations::formula_parser::ParserOptions;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "stoichkit_config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration structure of StoichKit.
///
/// # Fields
/// * `decimal_places` - digits after the decimal point in printed results
/// * `strict_parsing` - reject unrecognised characters in formulas instead of ignoring them
/// * `pivot_tolerance` - magnitudes below this value are zeros during elimination
/// * `precision_scale` - scale applied to fractional coefficients before rounding
/// * `show_calculation_steps` - print intermediate steps of stoichiometry and limiting reagent
/// * `log_level` - "off", "error", "warn", "info", "debug" or "trace"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub decimal_places: usize,
    pub strict_parsing: bool,
    pub pivot_tolerance: f64,
    pub precision_scale: f64,
    pub show_calculation_steps: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            decimal_places: 3,
            strict_parsing: false,
            pivot_tolerance: PIVOT_TOLERANCE,
            precision_scale: PRECISION_SCALE,
            show_calculation_steps: true,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            strict: self.strict_parsing,
        }
    }

    pub fn balancer_options(&self) -> BalancerOptions {
        BalancerOptions {
            tolerance: self.pivot_tolerance,
            precision_scale: self.precision_scale,
        }
    }

    /// checks every field, returns the first invalid one
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.decimal_places > 15 {
            return Err(invalid("decimal_places", "must be at most 15"));
        }
        if !(self.pivot_tolerance.is_finite() && self.pivot_tolerance > 0.0) {
            return Err(invalid("pivot_tolerance", "must be a positive number"));
        }
        if !(self.precision_scale.is_finite() && self.precision_scale >= 1.0) {
            return Err(invalid("precision_scale", "must be a number not less than 1"));
        }
        if self.log_level.trim().parse::<log::LevelFilter>().is_err() {
            return Err(invalid(
                "log_level",
                "expected off, error, warn, info, debug or trace",
            ));
        }
        Ok(())
    }
}

/// Loads, updates and persists the settings.
///
/// # Fields
/// * `settings` - current settings
/// * `config_file` - path to the configuration file for persistence
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Settings,
    config_file: String,
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsManager {
    /// Loads "stoichkit_config.json" from the current directory, defaults when the file is
    /// missing or invalid
    pub fn new() -> Self {
        Self::with_config_file(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`SettingsManager::new`] for a custom configuration file path
    pub fn with_config_file(config_file: &str) -> Self {
        let (manager, error) = Self::load(config_file);
        if let Some(e) = error {
            warn!("{}, using default settings", e);
        }
        manager
    }

    /// Loads the configuration file. On failure the manager holds the defaults and the error is
    /// returned next to it, for callers that have to report it once their logger is running.
    pub fn load(config_file: &str) -> (Self, Option<SettingsError>) {
        let (settings, error) = match Self::load_config(config_file) {
            Ok(settings) => (settings, None),
            Err(e) => (Settings::default(), Some(e)),
        };
        let manager = Self {
            settings,
            config_file: config_file.to_string(),
        };
        (manager, error)
    }

    /// Reads and validates the configuration file, a missing file gives the defaults.
    pub fn load_config(config_file: &str) -> Result<Settings, SettingsError> {
        if Path::new(config_file).exists() {
            let content = fs::read_to_string(config_file)?;
            let settings: Settings = serde_json::from_str(&content)?;
            settings.validate()?;
            info!("settings loaded from {}", config_file);
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Writes the current settings as pretty JSON to the config file.
    pub fn save_config(&self) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Replaces the settings when they are valid and saves them.
    pub fn update(&mut self, settings: Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.settings = settings;
        self.save_config()
    }

    pub fn set_decimal_places(&mut self, decimal_places: usize) -> Result<(), SettingsError> {
        let mut settings = self.settings.clone();
        settings.decimal_places = decimal_places;
        self.update(settings)
    }

    pub fn set_strict_parsing(&mut self, strict: bool) -> Result<(), SettingsError> {
        let mut settings = self.settings.clone();
        settings.strict_parsing = strict;
        self.update(settings)
    }

    pub fn set_log_level(&mut self, level: &str) -> Result<(), SettingsError> {
        let mut settings = self.settings.clone();
        settings.log_level = level.trim().to_lowercase();
        self.update(settings)
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), SettingsError> {
        self.update(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.decimal_places, 3);
        assert!(!settings.strict_parsing);
        assert_eq!(settings.pivot_tolerance, 1e-10);
        assert_eq!(settings.precision_scale, 1e6);
        assert!(settings.show_calculation_steps);
        assert_eq!(settings.log_level, "info");
        assert!(settings.validate().is_ok());
        assert_eq!(settings.parser_options(), ParserOptions::default());
        assert_eq!(settings.balancer_options(), BalancerOptions::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let manager = SettingsManager::with_config_file("definitely_missing_stoichkit_config.json");
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_partial_file_is_completed_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"decimal_places": 5, "strict_parsing": true}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let settings = SettingsManager::load_config(path).unwrap();
        assert_eq!(settings.decimal_places, 5);
        assert!(settings.strict_parsing);
        assert_eq!(settings.log_level, "info");
        assert!(settings.parser_options().strict);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap();
        assert!(matches!(
            SettingsManager::load_config(path),
            Err(SettingsError::Json(_))
        ));
        assert_eq!(
            SettingsManager::with_config_file(path).settings(),
            &Settings::default()
        );

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"pivot_tolerance": -1.0}}"#).unwrap();
        let path = file.path().to_str().unwrap();
        assert!(matches!(
            SettingsManager::load_config(path),
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_returns_the_error_next_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ broken").unwrap();
        let path = file.path().to_str().unwrap();
        let (manager, error) = SettingsManager::load(path);
        assert!(matches!(error, Some(SettingsError::Json(_))));
        assert_eq!(manager.settings(), &Settings::default());
        assert_eq!(manager.config_file(), path);

        let (manager, error) = SettingsManager::load("definitely_missing_stoichkit_config.json");
        assert!(error.is_none());
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let mut manager = SettingsManager::with_config_file(path);
        manager.set_decimal_places(6).unwrap();
        manager.set_strict_parsing(true).unwrap();
        manager.set_log_level("DEBUG").unwrap();

        let reloaded = SettingsManager::with_config_file(path);
        assert_eq!(reloaded.settings().decimal_places, 6);
        assert!(reloaded.settings().strict_parsing);
        assert_eq!(reloaded.settings().log_level, "debug");

        manager.reset_to_defaults().unwrap();
        let reloaded = SettingsManager::with_config_file(path);
        assert_eq!(reloaded.settings(), &Settings::default());
    }

    #[test]
    fn test_invalid_updates_are_rejected() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let mut manager = SettingsManager::with_config_file(path);
        assert!(manager.set_decimal_places(40).is_err());
        assert!(manager.set_log_level("loud").is_err());
        assert_eq!(manager.settings(), &Settings::default());
    }
}
