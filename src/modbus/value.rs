// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Typed PLC values

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The three variable types exposed by the PLC
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Single coil bit
    Bool,
    /// Signed 16-bit integer in one holding register
    Int,
    /// 32-bit float in two consecutive holding registers
    Real,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Bool => "bool",
            VariableKind::Int => "int",
            VariableKind::Real => "real",
        }
    }

    /// Label used in operator-facing messages (`BOOL`, `INT`, `REAL`)
    pub fn label(&self) -> &'static str {
        match self {
            VariableKind::Bool => "BOOL",
            VariableKind::Int => "INT",
            VariableKind::Real => "REAL",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(VariableKind::Bool),
            "int" => Ok(VariableKind::Int),
            "real" => Ok(VariableKind::Real),
            other => Err(format!(
                "invalid variable type '{}', expected bool, int or real",
                other
            )),
        }
    }
}

/// A value read from or written to the PLC
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Int(i16),
    Real(f32),
}

impl TypedValue {
    pub fn kind(&self) -> VariableKind {
        match self {
            TypedValue::Bool(_) => VariableKind::Bool,
            TypedValue::Int(_) => VariableKind::Int,
            TypedValue::Real(_) => VariableKind::Real,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{}", v),
            TypedValue::Int(v) => write!(f, "{}", v),
            TypedValue::Real(v) => write!(f, "{}", v),
        }
    }
}
