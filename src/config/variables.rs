// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Named PLC variables
//!
//! The variable map lists the PLC tags the API reads in bulk. Coil and
//! register addresses are zero-based: `PC_Start` at coil 0 is vendor coil 1,
//! `PC_Temp` at register 1 spans HR 40002-40003.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::modbus::VariableKind;

/// One named PLC tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VariableDef {
    pub name: String,
    pub address: u16,
    #[serde(default)]
    pub description: String,
}

impl VariableDef {
    fn new(name: &str, address: u16, description: &str) -> Self {
        Self {
            name: name.to_string(),
            address,
            description: description.to_string(),
        }
    }
}

/// PLC tags grouped by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VariablesConfig {
    #[serde(rename = "bool", default)]
    pub booleans: Vec<VariableDef>,
    #[serde(rename = "int", default)]
    pub integers: Vec<VariableDef>,
    #[serde(rename = "real", default)]
    pub reals: Vec<VariableDef>,
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            booleans: vec![
                VariableDef::new("PC_Start", 0, "Start command (coil 1)"),
                VariableDef::new("PC_Stop", 1, "Stop command (coil 2)"),
                VariableDef::new("PC_Falha", 2, "Fault indication (coil 3)"),
            ],
            integers: vec![VariableDef::new(
                "PC_Estado",
                0,
                "Machine state (HR 40001)",
            )],
            reals: vec![VariableDef::new(
                "PC_Temp",
                1,
                "Temperature °C (HR 40002-40003)",
            )],
        }
    }
}

impl VariablesConfig {
    pub fn of_kind(&self, kind: VariableKind) -> &[VariableDef] {
        match kind {
            VariableKind::Bool => &self.booleans,
            VariableKind::Int => &self.integers,
            VariableKind::Real => &self.reals,
        }
    }

    /// Every variable with its type, booleans first
    pub fn iter(&self) -> impl Iterator<Item = (VariableKind, &VariableDef)> {
        [VariableKind::Bool, VariableKind::Int, VariableKind::Real]
            .into_iter()
            .flat_map(move |kind| self.of_kind(kind).iter().map(move |v| (kind, v)))
    }
}
