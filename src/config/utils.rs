// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};
use crate::modbus::codec::{self, FLOAT32_WORDS};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_plc_monitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validate YAML text against the embedded JSON schema
pub fn validate_against_schema(contents: &str) -> Result<()> {
    // First step: convert YAML to a generic Value
    let yaml_value: serde_yml::Value =
        serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

    // Convert to JSON Value for validation
    let json_value =
        serde_json::to_value(&yaml_value).context("Failed to convert YAML to JSON for validation")?;

    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let validator = jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)?;

    let messages: Vec<String> = validator
        .iter_errors(&json_value)
        .map(|error| format!("{} at {}", error, error.instance_path))
        .collect();
    if !messages.is_empty() {
        anyhow::bail!("Configuration validation failed: {}", messages.join("; "));
    }
    Ok(())
}

/// Validate a configuration file without loading it or writing anything
///
/// Used by `--validate-config`.
pub fn validate_config_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file at {:?}", path))?;
    validate_against_schema(&contents)?;
    let config: Config = serde_yml::from_str(&contents)
        .with_context(|| format!("Failed to deserialize configuration from {:?}", path))?;
    validate_specific_rules(&config)?;
    Ok(config)
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **SSL Configuration**: a certificate needs a key and vice versa, both valid base64
/// - **Port Range**: the web port is within 1-65534
/// - **Sampling**: the interval is at least one second, the threshold is a positive number
/// - **Addresses**: a `REAL` needs two registers, so it cannot start at 65535
/// - **Variables**: names are non-empty and unique
/// - **Analyzer**: at least one attempt
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    // Validate SSL certificates
    if let Some(cert) = &config.web.cert {
        if config.web.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.web.key {
        if config.web.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }
        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if config.web.port < 1 || config.web.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.web.port);
    }

    if !is_valid_ip_address(&config.web.address) {
        // Just issue a warning but don't block
        warn!("Potentially invalid address format: {}", config.web.address);
    }

    if config.plc.address.trim().is_empty() {
        anyhow::bail!("PLC address must not be empty");
    }
    if config.plc.timeout_ms == 0 {
        anyhow::bail!("PLC timeout must be greater than zero");
    }

    if config.monitoring.interval_secs == 0 {
        anyhow::bail!("Monitoring interval must be at least one second");
    }
    let threshold = config.monitoring.anomaly_threshold;
    if !threshold.is_finite() || threshold <= 0.0 {
        anyhow::bail!("Invalid anomaly threshold: {}", threshold);
    }
    check_real_address("monitoring.temperature_address", config.monitoring.temperature_address)?;

    if config.watchdog.rollover < 0 {
        anyhow::bail!("Watchdog rollover must not be negative");
    }

    if config.analyzer.max_attempts == 0 {
        anyhow::bail!("Analyzer needs at least one attempt");
    }

    let mut names = HashSet::new();
    for (kind, variable) in config.variables.iter() {
        if variable.name.trim().is_empty() {
            anyhow::bail!("A {} variable has an empty name", kind.label());
        }
        if !names.insert((kind, variable.name.as_str())) {
            anyhow::bail!("Duplicate {} variable name: {}", kind.label(), variable.name);
        }
    }
    for variable in &config.variables.reals {
        check_real_address(&variable.name, variable.address)?;
    }

    Ok(())
}

fn check_real_address(name: &str, address: u16) -> Result<()> {
    codec::check_span(address, FLOAT32_WORDS)
        .with_context(|| format!("{}: invalid REAL address", name))
}
