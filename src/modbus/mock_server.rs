// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-process PLC simulator
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The simulated PLC is the server, the
//! monitor is the client.
//!
//! ## Memory Map
//!
//! | Area | Addresses | Access |
//! |------|-----------|--------|
//! | Coils | 0-99 | read/write (FC01, FC05, FC15) |
//! | Holding registers | 0-99 | read/write (FC03, FC06, FC16) |
//!
//! Every register starts at 0 and every coil at `false`. Requests outside the
//! map are answered with `IllegalDataAddress`, other function codes with
//! `IllegalFunction`.
//!
//! The memory is shared by every connection and by the [`MockPlcServer`]
//! handle, so tests and the simulator binary can poke values the client then
//! reads.

use std::{
    future,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use super::codec;

/// Number of coils exposed by the simulator
pub const COIL_COUNT: usize = 100;

/// Number of holding registers exposed by the simulator
pub const REGISTER_COUNT: usize = 100;

#[derive(Debug)]
struct Memory {
    coils: Vec<bool>,
    holding_registers: Vec<u16>,
}

/// A simulated PLC with coils and holding registers
#[derive(Debug, Clone)]
pub struct MockPlcServer {
    memory: Arc<Mutex<Memory>>,
}

impl Default for MockPlcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl tokio_modbus::server::Service for MockPlcServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// Handled function codes:
    /// - 0x01: Read Coils
    /// - 0x05: Write Single Coil
    /// - 0x0F: Write Multiple Coils
    /// - 0x03: Read Holding Registers
    /// - 0x06: Write Single Register
    /// - 0x10: Write Multiple Registers
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("SERVER: received {:?}", req);
        let res = match self.memory() {
            Ok(mut memory) => match req {
                Request::ReadCoils(addr, cnt) => {
                    read_range(&memory.coils, addr, cnt).map(Response::ReadCoils)
                }
                Request::WriteSingleCoil(addr, value) => {
                    write_range(&mut memory.coils, addr, std::slice::from_ref(&value))
                        .map(|_| Response::WriteSingleCoil(addr, value))
                }
                Request::WriteMultipleCoils(addr, values) => {
                    write_range(&mut memory.coils, addr, &values)
                        .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16))
                }
                Request::ReadHoldingRegisters(addr, cnt) => {
                    read_range(&memory.holding_registers, addr, cnt)
                        .map(Response::ReadHoldingRegisters)
                }
                Request::WriteSingleRegister(addr, value) => write_range(
                    &mut memory.holding_registers,
                    addr,
                    std::slice::from_ref(&value),
                )
                .map(|_| Response::WriteSingleRegister(addr, value)),
                Request::WriteMultipleRegisters(addr, values) => {
                    write_range(&mut memory.holding_registers, addr, &values)
                        .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
                }
                _ => {
                    error!("SERVER: Exception::IllegalFunction - Unimplemented function code in request: {req:?}");
                    Err(ExceptionCode::IllegalFunction)
                }
            },
            Err(code) => Err(code),
        };
        future::ready(res)
    }
}

impl MockPlcServer {
    /// Create a simulator with all coils off and all registers at zero
    pub fn new() -> Self {
        Self {
            memory: Arc::new(Mutex::new(Memory {
                coils: vec![false; COIL_COUNT],
                holding_registers: vec![0; REGISTER_COUNT],
            })),
        }
    }

    fn memory(&self) -> Result<MutexGuard<'_, Memory>, ExceptionCode> {
        self.memory.lock().map_err(|_| {
            error!("SERVER: memory lock poisoned");
            ExceptionCode::ServerDeviceFailure
        })
    }

    pub fn coil(&self, address: u16) -> Option<bool> {
        let memory = self.memory().ok()?;
        memory.coils.get(usize::from(address)).copied()
    }

    pub fn set_coil(&self, address: u16, value: bool) -> bool {
        match self.memory() {
            Ok(mut memory) => write_range(&mut memory.coils, address, &[value]).is_ok(),
            Err(_) => false,
        }
    }

    pub fn register(&self, address: u16) -> Option<u16> {
        let memory = self.memory().ok()?;
        memory.holding_registers.get(usize::from(address)).copied()
    }

    pub fn set_register(&self, address: u16, value: u16) -> bool {
        match self.memory() {
            Ok(mut memory) => write_range(&mut memory.holding_registers, address, &[value]).is_ok(),
            Err(_) => false,
        }
    }

    /// Read the `REAL` stored at `address` and `address + 1`
    pub fn real(&self, address: u16) -> Option<f32> {
        let memory = self.memory().ok()?;
        let words = read_range(&memory.holding_registers, address, codec::FLOAT32_WORDS as u16).ok()?;
        codec::decode_float32(&words).ok()
    }

    /// Store a `REAL` at `address` and `address + 1`
    pub fn set_real(&self, address: u16, value: f32) -> bool {
        match self.memory() {
            Ok(mut memory) => write_range(
                &mut memory.holding_registers,
                address,
                &codec::encode_float32(value),
            )
            .is_ok(),
            Err(_) => false,
        }
    }

    /// Serve Modbus/TCP on `listener` until the task is dropped or aborted
    ///
    /// Every connection shares this simulator's memory.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Mock PLC listening on {}", local_addr);
        let server = Server::new(listener);

        let on_connected = move |stream, socket_addr: SocketAddr| {
            let service = self.clone();
            async move {
                debug!("SERVER: connection from {}", socket_addr);
                accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                    Ok(Some(service.clone()))
                })
            }
        };
        let on_process_error = |err| {
            error!("Mock PLC error: {err}");
        };

        server.serve(&on_connected, on_process_error).await?;
        Ok(())
    }

    /// Bind `address` and serve in a background task
    ///
    /// Returns the bound address, which differs from `address` when port 0
    /// was requested.
    pub async fn spawn(
        self,
        address: SocketAddr,
    ) -> io::Result<(SocketAddr, tokio::task::JoinHandle<io::Result<()>>)> {
        let listener = TcpListener::bind(address).await?;
        let local_addr = listener.local_addr()?;
        let handle = tokio::spawn(self.serve(listener));
        Ok((local_addr, handle))
    }
}

/// Read `cnt` consecutive values starting at `addr`
fn read_range<T: Copy>(area: &[T], addr: u16, cnt: u16) -> Result<Vec<T>, ExceptionCode> {
    let start = usize::from(addr);
    let end = start + usize::from(cnt);
    match area.get(start..end) {
        Some(values) => Ok(values.to_vec()),
        None => {
            error!("SERVER: Exception::IllegalDataAddress {}..{}", start, end);
            Err(ExceptionCode::IllegalDataAddress)
        }
    }
}

/// Write consecutive values starting at `addr`. Nothing is written when the
/// range does not fit.
fn write_range<T: Copy>(area: &mut [T], addr: u16, values: &[T]) -> Result<(), ExceptionCode> {
    let start = usize::from(addr);
    let end = start + values.len();
    match area.get_mut(start..end) {
        Some(slots) => {
            slots.copy_from_slice(values);
            Ok(())
        }
        None => {
            error!("SERVER: Exception::IllegalDataAddress {}..{}", start, end);
            Err(ExceptionCode::IllegalDataAddress)
        }
    }
}
