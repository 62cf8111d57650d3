// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Typed PLC client
//!
//! Maps `BOOL`, `INT` and `REAL` variables onto coils and holding registers
//! through the register codec. Addresses are zero-based: coil 00001 is
//! address 0 and holding register 40001 is address 0.

use log::debug;

use super::codec;
use super::error::PlcError;
use super::transport::Transport;
use super::value::{TypedValue, VariableKind};

/// Typed access to PLC variables over any [`Transport`]
pub struct PlcClient<T: Transport> {
    transport: T,
}

impl<T: Transport> PlcClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Open the link to the PLC
    pub async fn connect(&mut self) -> Result<(), PlcError> {
        self.transport.connect().await
    }

    /// Close the link to the PLC
    pub async fn close(&mut self) {
        self.transport.close().await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Replace the underlying transport, closing the previous one
    pub async fn replace_transport(&mut self, transport: T) {
        self.transport.close().await;
        self.transport = transport;
    }

    /// Read a `BOOL` from a coil
    pub async fn read_bool(&mut self, address: u16) -> Result<bool, PlcError> {
        let bit = self.transport.read_coil(address).await?;
        Ok(codec::decode_bool(bit))
    }

    /// Write a `BOOL` to a coil
    pub async fn write_bool(&mut self, address: u16, value: bool) -> Result<(), PlcError> {
        self.transport
            .write_coil(address, codec::encode_bool(value))
            .await
    }

    /// Read an `INT` from one holding register
    pub async fn read_int(&mut self, address: u16) -> Result<i16, PlcError> {
        let words = self
            .transport
            .read_registers(address, codec::INT16_WORDS as u16)
            .await?;
        Ok(codec::decode_int16(&words)?)
    }

    /// Write an `INT` to one holding register
    ///
    /// Values outside the signed 16-bit range are rejected before anything
    /// is sent to the PLC.
    pub async fn write_int(&mut self, address: u16, value: i64) -> Result<(), PlcError> {
        let words = codec::encode_int16(value)?;
        self.transport.write_registers(address, &words).await
    }

    /// Read a `REAL` from two holding registers
    pub async fn read_real(&mut self, address: u16) -> Result<f32, PlcError> {
        codec::check_span(address, codec::FLOAT32_WORDS)?;
        let words = self
            .transport
            .read_registers(address, codec::FLOAT32_WORDS as u16)
            .await?;
        Ok(codec::decode_float32(&words)?)
    }

    /// Write a `REAL` to two holding registers
    ///
    /// A value that would run past the last register is rejected before
    /// anything is sent to the PLC.
    pub async fn write_real(&mut self, address: u16, value: f32) -> Result<(), PlcError> {
        codec::check_span(address, codec::FLOAT32_WORDS)?;
        let words = codec::encode_float32(value);
        self.transport.write_registers(address, &words).await
    }

    /// Read a variable of the given kind
    pub async fn read_value(
        &mut self,
        kind: VariableKind,
        address: u16,
    ) -> Result<TypedValue, PlcError> {
        let value = match kind {
            VariableKind::Bool => TypedValue::Bool(self.read_bool(address).await?),
            VariableKind::Int => TypedValue::Int(self.read_int(address).await?),
            VariableKind::Real => TypedValue::Real(self.read_real(address).await?),
        };
        debug!("Read {} {} = {}", kind.label(), address, value);
        Ok(value)
    }

    /// Write a typed variable
    pub async fn write_value(&mut self, address: u16, value: TypedValue) -> Result<(), PlcError> {
        debug!("Writing {} {} = {}", value.kind().label(), address, value);
        match value {
            TypedValue::Bool(v) => self.write_bool(address, v).await,
            TypedValue::Int(v) => self.write_int(address, i64::from(v)).await,
            TypedValue::Real(v) => self.write_real(address, v).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::error::CodecError;
    use crate::modbus::transport::MockTransport;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_read_real_uses_two_registers() {
        let mut transport = MockTransport::new();
        transport
            .expect_read_registers()
            .with(eq(1), eq(2))
            .times(1)
            .returning(|_, _| Ok(vec![0x4297, 0x0000]));

        let mut client = PlcClient::new(transport);
        assert_eq!(client.read_real(1).await.unwrap(), 75.5);
    }

    #[tokio::test]
    async fn test_write_real_sends_high_word_first() {
        let mut transport = MockTransport::new();
        transport
            .expect_write_registers()
            .withf(|address, words| *address == 1 && words.to_vec() == vec![0x4297, 0x0000])
            .times(1)
            .returning(|_, _| Ok(()));

        let mut client = PlcClient::new(transport);
        client.write_real(1, 75.5).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_int_out_of_range_sends_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_write_registers().never();

        let mut client = PlcClient::new(transport);
        let err = client.write_int(0, 40000).await.unwrap_err();
        assert!(matches!(
            err,
            PlcError::Codec(CodecError::Range { value: 40000 })
        ));
    }

    #[tokio::test]
    async fn test_real_past_last_register_sends_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_read_registers().never();
        transport.expect_write_registers().never();

        let mut client = PlcClient::new(transport);
        let err = client.read_real(u16::MAX).await.unwrap_err();
        assert!(matches!(err, PlcError::Codec(CodecError::Span { .. })));
        let err = client.write_real(u16::MAX, 1.0).await.unwrap_err();
        assert!(matches!(err, PlcError::Codec(CodecError::Span { .. })));
    }

    #[tokio::test]
    async fn test_read_int_is_signed() {
        let mut transport = MockTransport::new();
        transport
            .expect_read_registers()
            .with(eq(0), eq(1))
            .returning(|_, _| Ok(vec![0xFB2E]));

        let mut client = PlcClient::new(transport);
        assert_eq!(client.read_int(0).await.unwrap(), -1234);
    }

    #[tokio::test]
    async fn test_short_register_response_is_length_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_read_registers()
            .returning(|_, _| Ok(vec![0x4297]));

        let mut client = PlcClient::new(transport);
        let err = client.read_real(1).await.unwrap_err();
        assert!(matches!(
            err,
            PlcError::Codec(CodecError::Length {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_value_dispatch() {
        let mut transport = MockTransport::new();
        transport
            .expect_read_coil()
            .with(eq(2))
            .returning(|_| Ok(true));
        transport
            .expect_write_coil()
            .with(eq(0), eq(false))
            .returning(|_, _| Ok(()));

        let mut client = PlcClient::new(transport);
        assert_eq!(
            client.read_value(VariableKind::Bool, 2).await.unwrap(),
            TypedValue::Bool(true)
        );
        client.write_value(0, TypedValue::Bool(false)).await.unwrap();
    }
}
