// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP API
//!
//! A Rocket server exposing the PLC variables and the temperature log as
//! JSON, documented with OpenAPI. All PLC routes share one [`SharedPlc`]
//! link; temperature routes read the reading log and drive the collector.
//! The same server hosts a small embedded dashboard over that API.
//!
//! [`SharedPlc`]: crate::modbus::SharedPlc

pub mod cors;
pub mod dashboard;
pub mod error;
pub mod plc;
pub mod server;
pub mod temperature;

pub use error::{ApiError, ErrorBody};
pub use server::{build_rocket, rocket_figment};
pub use temperature::{Collector, MonitorState};
