// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types for PLC communication
//!
//! Codec errors are raised while mapping typed values to register words and
//! are never retried. PLC errors cover the transport itself: a connection
//! failure is recoverable by reconnecting, a protocol error is an exception
//! response from the PLC and is surfaced to the caller of the operation.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the register codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value does not fit in a signed 16-bit register
    #[error("value {value} is out of range for a 16-bit signed integer (-32768..=32767)")]
    Range { value: i64 },

    /// The register sequence has the wrong number of words for the requested type
    #[error("expected {expected} register word(s), got {actual}")]
    Length { expected: usize, actual: usize },

    /// A multi-word value would run past the last holding register
    #[error("{words} register word(s) at address {address} run past the last register")]
    Span { address: u16, words: usize },
}

/// Errors raised while talking to the PLC
#[derive(Debug, Error)]
pub enum PlcError {
    /// The PLC could not be reached, or the link dropped
    #[error("connection error: {0}")]
    Connection(String),

    /// The PLC answered with a Modbus exception response
    #[error("PLC exception response: {0}")]
    Protocol(String),

    /// No answer within the configured timeout
    #[error("PLC did not answer within {0:?}")]
    Timeout(Duration),

    /// Value could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl PlcError {
    /// Whether reconnecting may fix the failure
    ///
    /// Connection drops and timeouts are link problems; protocol and codec
    /// errors would fail again on a fresh link.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, PlcError::Connection(_) | PlcError::Timeout(_))
    }
}

impl From<std::io::Error> for PlcError {
    fn from(err: std::io::Error) -> Self {
        PlcError::Connection(err.to_string())
    }
}

impl From<tokio_modbus::Error> for PlcError {
    fn from(err: tokio_modbus::Error) -> Self {
        match err {
            tokio_modbus::Error::Transport(io) => PlcError::Connection(io.to_string()),
            other => PlcError::Protocol(other.to_string()),
        }
    }
}

impl From<tokio_modbus::ExceptionCode> for PlcError {
    fn from(code: tokio_modbus::ExceptionCode) -> Self {
        PlcError::Protocol(code.to_string())
    }
}
