// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the PLC monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `plc`: Where the PLC is and how long to wait for it
//! - `web`: Settings for the HTTP API server
//! - `monitoring`: Temperature sampling loop and reading log
//! - `analyzer`: Language model service used to summarize readings
//! - `watchdog`: PLC heartbeat counter
//! - `variables`: Named PLC tags served by the API
//!
//! ## Usage
//!
//! ```no_run
//! use rust_plc_monitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                     // Web port
//!     Some("0.0.0.0".to_string()),    // Web address
//!     Some("127.0.0.1".to_string()),  // PLC address
//!     Some(5020),                     // PLC port
//!     None,                           // Monitoring enabled
//!     None,                           // Database path
//!     None,                           // Watchdog enabled
//!     None,                           // Analyzer provider
//! );
//!
//! println!("PLC at {}:{}", config.plc.address, config.plc.port);
//! ```

pub mod analyzer;
pub mod monitoring;
pub mod plc;
pub mod utils;
pub mod variables;
pub mod watchdog;
pub mod web;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use analyzer::{AnalyzerConfig, ProviderChoice};
pub use monitoring::MonitoringConfig;
pub use plc::PlcConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_config_file};
pub use variables::{VariableDef, VariablesConfig};
pub use watchdog::WatchdogConfig;
pub use web::WebConfig;

/// Embedded JSON schema of the configuration file
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure of the PLC monitor.
///
/// Every section falls back to its defaults when left out of the file, so a
/// minimal configuration only needs the values that differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// PLC connection settings
    #[serde(default)]
    pub plc: PlcConfig,

    /// HTTP API server settings
    #[serde(default)]
    pub web: WebConfig,

    /// Temperature sampling settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Language model analyzer settings
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// PLC heartbeat settings
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Named PLC variables
    #[serde(default)]
    pub variables: VariablesConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// fails validation leaves a `*.sample.yaml` next to it and is rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        if let Err(err) = utils::validate_against_schema(&contents) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            return Err(err.context(format!("Invalid configuration in {}", path.display())));
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were actually given override the loaded values.
    ///
    /// # Parameters
    ///
    /// * `web_port` - TCP port for the API server
    /// * `web_address` - Network address for the API server to bind to
    /// * `plc_address` - Host name or IP address of the PLC
    /// * `plc_port` - Modbus/TCP port of the PLC
    /// * `monitoring_enabled` - Start or skip the temperature sampling loop
    /// * `database_path` - SQLite file of the reading log
    /// * `watchdog_enabled` - Start or skip the PLC heartbeat
    /// * `analyzer_provider` - Language model service to use
    #[allow(clippy::too_many_arguments)]
    pub fn apply_args(
        &mut self,
        web_port: Option<u16>,
        web_address: Option<String>,
        plc_address: Option<String>,
        plc_port: Option<u16>,
        monitoring_enabled: Option<bool>,
        database_path: Option<PathBuf>,
        watchdog_enabled: Option<bool>,
        analyzer_provider: Option<ProviderChoice>,
    ) {
        if let Some(web_port) = web_port {
            debug!("Overriding web port from command line: {}", web_port);
            self.web.port = web_port;
        }
        if let Some(web_address) = web_address {
            debug!("Overriding web address from command line: {}", web_address);
            self.web.address = web_address;
        }

        if let Some(address) = plc_address {
            debug!("Overriding PLC address from command line: {}", address);
            self.plc.address = address;
        }
        if let Some(port) = plc_port {
            debug!("Overriding PLC port from command line: {}", port);
            self.plc.port = port;
        }

        if let Some(enabled) = monitoring_enabled {
            debug!("Overriding monitoring enabled from command line: {}", enabled);
            self.monitoring.enabled = enabled;
        }
        if let Some(path) = database_path {
            debug!("Overriding database path from command line: {:?}", path);
            self.monitoring.database_path = path.to_string_lossy().to_string();
        }

        if let Some(enabled) = watchdog_enabled {
            debug!("Overriding watchdog enabled from command line: {}", enabled);
            self.watchdog.enabled = enabled;
        }

        if let Some(provider) = analyzer_provider {
            debug!("Overriding analyzer provider from command line: {}", provider);
            self.analyzer.provider = provider;
        }
    }
}
