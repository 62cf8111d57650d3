// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One-shot PLC client
//!
//! Reads or writes one typed variable, or runs the BOOL/INT/REAL self-test
//! sequence against a PLC or the mock PLC.
//!
//! ```bash
//! plc_client --port 5020 --kind real --register 1
//! plc_client --port 5020 --kind int --register 0 --value 1234
//! plc_client --port 5020 --self-test
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rust_plc_monitor::modbus::{PlcClient, PlcEndpoint, TcpTransport, VariableKind};

/// Modbus/TCP client for the PLC variables
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// PLC address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// PLC port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Modbus unit identifier
    #[clap(long, default_value = "1")]
    unit_id: u8,

    /// Timeout of every exchange, in milliseconds
    #[clap(long, default_value = "3000")]
    timeout_ms: u64,

    /// Variable type: bool, int or real
    #[clap(long, default_value = "int")]
    kind: VariableKind,

    /// Zero-based coil or holding register address
    #[clap(long, default_value = "0")]
    register: u16,

    /// Value to write; the variable is only read when omitted
    #[clap(long, allow_hyphen_values = true)]
    value: Option<String>,

    /// Run the BOOL/INT/REAL write-and-read-back sequence
    #[clap(long)]
    self_test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let endpoint = PlcEndpoint {
        address: args.address.clone(),
        port: args.port,
        unit_id: args.unit_id,
        timeout: Duration::from_millis(args.timeout_ms),
    };
    println!("Connecting to PLC at {}", endpoint);
    let mut client = PlcClient::new(TcpTransport::new(endpoint));
    client.connect().await.context("Failed to connect to the PLC")?;

    let result = if args.self_test {
        self_test(&mut client).await
    } else {
        one_shot(&mut client, &args).await
    };

    client.close().await;
    println!("Connection closed");
    result
}

async fn one_shot(client: &mut PlcClient<TcpTransport>, args: &Args) -> Result<()> {
    let label = args.kind.label();
    if let Some(text) = &args.value {
        match args.kind {
            VariableKind::Bool => {
                let value: bool = text.parse().context("BOOL value must be true or false")?;
                client.write_bool(args.register, value).await?;
            }
            VariableKind::Int => {
                let value: i64 = text.parse().context("INT value must be an integer")?;
                client.write_int(args.register, value).await?;
            }
            VariableKind::Real => {
                let value: f32 = text.parse().context("REAL value must be a number")?;
                client.write_real(args.register, value).await?;
            }
        }
        println!("{} {} set to {}", label, args.register, text);
    }

    let value = client.read_value(args.kind, args.register).await?;
    println!("{} {} = {}", label, args.register, value);
    Ok(())
}

async fn self_test(client: &mut PlcClient<TcpTransport>) -> Result<()> {
    println!("{}", "-".repeat(50));
    println!("[TEST 1] BOOL - coil 0");
    println!("  > Initial read: {}", client.read_bool(0).await?);
    println!("  > Writing true...");
    client.write_bool(0, true).await?;
    println!("  > Read after write: {}", client.read_bool(0).await?);
    println!("  > Writing false...");
    client.write_bool(0, false).await?;
    println!("  > Final read: {}", client.read_bool(0).await?);
    println!("{}", "-".repeat(50));

    println!("[TEST 2] INT - HR 0");
    println!("  > Initial read: {}", client.read_int(0).await?);
    println!("  > Writing 1234...");
    client.write_int(0, 1234).await?;
    println!("  > Confirmed read: {}", client.read_int(0).await?);
    println!("{}", "-".repeat(50));

    println!("[TEST 3] REAL - HR 1");
    println!("  > Initial read: {:.2}", client.read_real(1).await?);
    println!("  > Writing 75.5...");
    client.write_real(1, 75.5).await?;
    println!("  > Confirmed read: {:.2}", client.read_real(1).await?);
    println!("{}", "-".repeat(50));

    println!("All tests completed successfully");
    Ok(())
}
