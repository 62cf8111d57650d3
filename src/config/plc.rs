// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC connection configuration

use serde::{Deserialize, Serialize};

/// Where and how to reach the PLC over Modbus/TCP.
///
/// # Example
///
/// ```
/// use rust_plc_monitor::config::PlcConfig;
///
/// let plc = PlcConfig {
///     address: "127.0.0.1".to_string(),
///     port: 5020,
///     ..Default::default()
/// };
/// assert_eq!(plc.unit_id, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlcConfig {
    /// Host name or IP address of the PLC
    #[serde(default = "default_address")]
    pub address: String,

    /// Modbus/TCP port. 502 on a real PLC, 5020 for the simulator.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Modbus unit identifier
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Upper bound for every connect and register exchange, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_address() -> String {
    "192.168.0.200".to_string()
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
