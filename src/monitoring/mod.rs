// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature monitoring
//!
//! - [`TemperatureCollector`] samples the PLC temperature on a fixed schedule
//!   and flags fast changes as anomalies
//! - [`ReadingLog`] persists the readings, [`SqliteReadingLog`] in SQLite
//! - [`Watchdog`] keeps the PLC heartbeat counter moving

pub mod collector;
pub mod session;
pub mod store;
pub mod watchdog;

pub use collector::{CollectorSettings, TemperatureCollector};
pub use session::{Observation, SamplingSession};
pub use store::{Reading, ReadingLog, SqliteReadingLog, Statistics, StoreError};
pub use watchdog::{Watchdog, WatchdogSettings};
