// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point of the PLC monitor daemon

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal;

use rust_plc_monitor::config::{self, Config, ProviderChoice};
use rust_plc_monitor::daemon::Daemon;

/// Modbus/TCP PLC monitor with temperature logging and analysis
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (created with defaults when missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate a configuration file and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Web server port
    #[arg(short = 'p', long)]
    web_port: Option<u16>,

    /// Web server address
    #[arg(short, long)]
    web_address: Option<String>,

    /// PLC host name or IP address
    #[arg(long)]
    plc_address: Option<String>,

    /// PLC Modbus/TCP port
    #[arg(long)]
    plc_port: Option<u16>,

    /// Start or skip temperature collection
    #[arg(long)]
    monitoring: Option<bool>,

    /// SQLite file of the reading log
    #[arg(long)]
    database: Option<PathBuf>,

    /// Start or skip the PLC heartbeat
    #[arg(long)]
    watchdog: Option<bool>,

    /// Language model provider: auto, groq, gemini or none
    #[arg(long)]
    analyzer: Option<ProviderChoice>,

    /// Enable verbose (debug) logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        config::validate_config_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.web_port,
        args.web_address.clone(),
        args.plc_address.clone(),
        args.plc_port,
        args.monitoring,
        args.database.clone(),
        args.watchdog,
        args.analyzer,
    );

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }
    daemon.shutdown().await;
    daemon.join().await?;

    Ok(())
}
