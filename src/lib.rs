// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust PLC monitor library
//!
//! Glue between a Modbus/TCP PLC and its operators: typed access to PLC
//! variables, a temperature sampling loop with anomaly detection persisted
//! to SQLite, an HTTP API, and analysis of the readings by a language model
//! with a local fallback.

pub mod analysis;
pub mod config;
pub mod daemon;
pub mod modbus;
pub mod monitoring;
pub mod utility;
pub mod web;
