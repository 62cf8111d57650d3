// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module talks to the PLC over Modbus/TCP. The wire protocol itself is
//! handled by `tokio-modbus`; this module maps typed variables onto it.
//!
//! ## Key Components
//!
//! - [`codec`]: bit-exact conversion between typed values and register words
//! - [`Transport`]: raw register and coil access, implemented by [`TcpTransport`]
//! - [`PlcClient`]: typed `BOOL` / `INT` / `REAL` access over a transport
//! - [`SharedPlc`]: one link shared by concurrent request handlers
//! - [`MockPlcServer`]: in-process PLC simulator used by tests and `mock_plc`
//!
//! ## Addressing
//!
//! All addresses are zero-based. Vendor label 00001 is coil 0 and label 40001
//! is holding register 0. A `REAL` at address `n` occupies registers `n` and
//! `n + 1`, most significant word first.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_plc_monitor::modbus::{PlcClient, PlcEndpoint, TcpTransport};
//!
//! # async fn demo() -> Result<(), rust_plc_monitor::modbus::PlcError> {
//! let mut client = PlcClient::new(TcpTransport::new(PlcEndpoint::new("127.0.0.1", 5020)));
//! client.connect().await?;
//! let temperature = client.read_real(1).await?;
//! client.write_int(0, 2).await?;
//! client.close().await;
//! # let _ = temperature;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod mock_server;
pub mod shared;
pub mod transport;
pub mod value;

pub use client::PlcClient;
pub use error::{CodecError, PlcError};
pub use mock_server::MockPlcServer;
pub use shared::{ConnectionStatus, SharedPlc};
pub use transport::{PlcEndpoint, TcpTransport, Transport, TransportFactory};
pub use value::{TypedValue, VariableKind};
