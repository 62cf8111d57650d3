// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus transport
//!
//! The [`Transport`] trait is the seam between the typed client and the
//! Modbus stack. [`TcpTransport`] implements it on top of `tokio-modbus`,
//! bounding every connect and register exchange with the configured timeout.
//! Callers never assume a transport is connected; they call
//! [`Transport::connect`] themselves.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use super::error::PlcError;
use crate::config::PlcConfig;

/// Raw register and coil access to a PLC
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Open the link. Reconnecting an open transport replaces the link.
    async fn connect(&mut self) -> Result<(), PlcError>;

    /// Whether a link is currently held
    fn is_connected(&self) -> bool;

    /// Read `count` holding registers starting at `address`
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PlcError>;

    /// Write consecutive holding registers starting at `address`
    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), PlcError>;

    /// Read a single coil
    async fn read_coil(&mut self, address: u16) -> Result<bool, PlcError>;

    /// Write a single coil
    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), PlcError>;

    /// Drop the link. Closing a closed transport is a no-op.
    async fn close(&mut self);
}

/// Creates independent transports
///
/// The sampling loop asks for a fresh transport every cycle so it never
/// contends with request handlers for the shared link.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: Transport + 'static;

    fn create(&self) -> Self::Transport;
}

/// Network location and timing of a Modbus/TCP PLC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlcEndpoint {
    pub address: String,
    pub port: u16,
    pub unit_id: u8,
    pub timeout: Duration,
}

impl PlcEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            unit_id: 1,
            timeout: Duration::from_secs(3),
        }
    }
}

impl From<&PlcConfig> for PlcEndpoint {
    fn from(config: &PlcConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
            unit_id: config.unit_id,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

impl fmt::Display for PlcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl TransportFactory for PlcEndpoint {
    type Transport = TcpTransport;

    fn create(&self) -> TcpTransport {
        TcpTransport::new(self.clone())
    }
}

/// Modbus/TCP transport backed by `tokio-modbus`
pub struct TcpTransport {
    endpoint: PlcEndpoint,
    ctx: Option<Context>,
}

impl TcpTransport {
    pub fn new(endpoint: PlcEndpoint) -> Self {
        Self {
            endpoint,
            ctx: None,
        }
    }

    pub fn endpoint(&self) -> &PlcEndpoint {
        &self.endpoint
    }

    /// Takes the target by value so no borrow of the transport lives across
    /// the lookup; the modbus context is not `Sync`.
    async fn resolve(target: String) -> Result<SocketAddr, PlcError> {
        let mut addrs = tokio::net::lookup_host(&target).await?;
        addrs
            .next()
            .ok_or_else(|| PlcError::Connection(format!("could not resolve {}", target)))
    }

    fn context(&mut self) -> Result<&mut Context, PlcError> {
        self.ctx
            .as_mut()
            .ok_or_else(|| PlcError::Connection("not connected".to_string()))
    }

    /// Map the outcome of one exchange, dropping the link on transport failure
    fn settle<T>(
        &mut self,
        outcome: Result<tokio_modbus::Result<T>, time::error::Elapsed>,
    ) -> Result<T, PlcError> {
        let result = match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(exception))) => Err(PlcError::from(exception)),
            Ok(Err(err)) => Err(PlcError::from(err)),
            Err(_) => Err(PlcError::Timeout(self.endpoint.timeout)),
        };
        if let Err(err) = &result {
            if err.is_connection_error() {
                self.ctx = None;
            }
        }
        result
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), PlcError> {
        let timeout = self.endpoint.timeout;
        let slave = Slave(self.endpoint.unit_id);
        let socket_addr = Self::resolve(self.endpoint.to_string()).await?;
        debug!("Connecting to PLC at {}", socket_addr);
        let ctx = time::timeout(timeout, tcp::connect_slave(socket_addr, slave))
            .await
            .map_err(|_| PlcError::Timeout(timeout))??;
        self.ctx = Some(ctx);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PlcError> {
        debug!("Reading {} holding registers at {}", count, address);
        let timeout = self.endpoint.timeout;
        let ctx = self.context()?;
        let outcome = time::timeout(timeout, ctx.read_holding_registers(address, count)).await;
        self.settle(outcome)
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), PlcError> {
        debug!("Writing {:?} to holding registers at {}", words, address);
        let timeout = self.endpoint.timeout;
        let ctx = self.context()?;
        let outcome = time::timeout(timeout, ctx.write_multiple_registers(address, words)).await;
        self.settle(outcome)
    }

    async fn read_coil(&mut self, address: u16) -> Result<bool, PlcError> {
        debug!("Reading coil {}", address);
        let timeout = self.endpoint.timeout;
        let ctx = self.context()?;
        let outcome = time::timeout(timeout, ctx.read_coils(address, 1)).await;
        let bits = self.settle(outcome)?;
        bits.first()
            .copied()
            .ok_or_else(|| PlcError::Protocol(format!("empty coil response for {}", address)))
    }

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), PlcError> {
        debug!("Writing {} to coil {}", value, address);
        let timeout = self.endpoint.timeout;
        let ctx = self.context()?;
        let outcome = time::timeout(timeout, ctx.write_single_coil(address, value)).await;
        self.settle(outcome)
    }

    async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(err) = ctx.disconnect().await {
                debug!("Error while disconnecting from {}: {}", self.endpoint, err);
            }
        }
    }
}
