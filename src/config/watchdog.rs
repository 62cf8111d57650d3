// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC watchdog configuration

use serde::{Deserialize, Serialize};

/// Settings of the heartbeat counter written to the PLC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Disabled by default: only enable it when the PLC program expects it
    #[serde(default)]
    pub enabled: bool,

    /// Zero-based holding register of the counter (3 is HR 40004)
    #[serde(default = "default_address")]
    pub address: u16,

    /// Heartbeat period in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Highest counter value before wrapping to 0
    #[serde(default = "default_rollover")]
    pub rollover: i16,
}

fn default_address() -> u16 {
    3
}

fn default_period_ms() -> u64 {
    500
}

fn default_rollover() -> i16 {
    30000
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_address(),
            period_ms: default_period_ms(),
            rollover: default_rollover(),
        }
    }
}
