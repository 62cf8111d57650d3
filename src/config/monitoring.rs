// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature monitoring configuration

use serde::{Deserialize, Serialize};

/// Settings of the temperature sampling loop and its reading log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Start the sampling loop with the daemon
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Zero-based holding register of the temperature `REAL`.
    ///
    /// Default 1 is the float stored in HR 40002-40003.
    #[serde(default = "default_temperature_address")]
    pub temperature_address: u16,

    /// Sampling interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Rate of change above which a sample is an anomaly, in °C per second.
    ///
    /// Applied as a rate whatever the interval: 0.4 °C/s is 2 °C over 5 s.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// SQLite database file of the reading log
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long a stop request waits for the loop to exit, in seconds
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_temperature_address() -> u16 {
    1
}

fn default_interval_secs() -> u64 {
    5
}

fn default_anomaly_threshold() -> f64 {
    0.4
}

fn default_database_path() -> String {
    "temperature_data.db".to_string()
}

fn default_stop_timeout_secs() -> u64 {
    10
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            temperature_address: default_temperature_address(),
            interval_secs: default_interval_secs(),
            anomaly_threshold: default_anomaly_threshold(),
            database_path: default_database_path(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}
