// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Standalone PLC simulator
//!
//! Serves 100 coils and 100 holding registers over Modbus/TCP, by default on
//! `127.0.0.1:5020` so that no privileges are needed. With `--drift`, the
//! temperature `REAL` slowly oscillates so the collector has something to
//! record.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use rust_plc_monitor::modbus::MockPlcServer;

/// Mock Modbus/TCP PLC
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1:5020")]
    listen: SocketAddr,

    /// Initial temperature
    #[clap(long, default_value = "25.0")]
    temperature: f32,

    /// Holding register of the temperature `REAL`
    #[clap(long, default_value = "1")]
    temperature_register: u16,

    /// Oscillate the temperature around its initial value
    #[clap(long)]
    drift: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let plc = MockPlcServer::new();
    if !plc.set_real(args.temperature_register, args.temperature) {
        anyhow::bail!(
            "Register {} is outside the simulated memory",
            args.temperature_register
        );
    }

    info!("Memory map:");
    info!("  Coils 0-99");
    info!("  HR 0: machine state (INT)");
    info!("  HR 1-2: temperature (REAL)");
    info!("  HR 3: watchdog (INT)");

    let (address, server) = plc.clone().spawn(args.listen).await?;
    info!("Mock PLC started on {}", address);

    if args.drift {
        let register = args.temperature_register;
        let base = args.temperature;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let mut step: u32 = 0;
            loop {
                ticker.tick().await;
                step = step.wrapping_add(1);
                let value = base + 2.0 * (step as f32 / 30.0).sin();
                plc.set_real(register, value);
                debug!("Temperature set to {:.2}", value);
            }
        });
    }

    tokio::select! {
        result = server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Mock PLC stopped");
        }
    }
    Ok(())
}
