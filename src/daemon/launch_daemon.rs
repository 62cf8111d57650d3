// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Launches and supervises the background tasks of the monitor
//!
//! Depending on the configuration, the daemon runs:
//!
//! * the HTTP API server
//! * the temperature collector
//! * a connection watcher refreshing the shared PLC link status
//! * the PLC heartbeat watchdog
//!
//! Every task watches the shared `running` flag and ends once it is cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::analysis::TemperatureAnalyzer;
use crate::config::Config;
use crate::modbus::{PlcEndpoint, SharedPlc};
use crate::monitoring::{
    CollectorSettings, SqliteReadingLog, TemperatureCollector, Watchdog, WatchdogSettings,
};
use crate::web::{build_rocket, rocket_figment, Collector, MonitorState};

/// How often the connection watcher re-checks the PLC link
pub const CONNECTION_CHECK_PERIOD: Duration = Duration::from_secs(5);

/// Represents the set of background tasks of the monitor
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    plc: Option<SharedPlc>,
    collector: Option<Arc<Collector>>,
    web_shutdown: Option<rocket::Shutdown>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
            plc: None,
            collector: None,
            web_shutdown: None,
        }
    }

    /// Launch all configured tasks
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let endpoint = PlcEndpoint::from(&config.plc);
        info!("PLC target: {}", endpoint);

        let plc = SharedPlc::new(endpoint.clone());
        self.plc = Some(plc.clone());

        let log = Arc::new(
            SqliteReadingLog::open(&config.monitoring.database_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open reading log at {}",
                        config.monitoring.database_path
                    )
                })?,
        );
        let collector = Arc::new(TemperatureCollector::new(
            endpoint.clone(),
            Arc::clone(&log),
            CollectorSettings::from(&config.monitoring),
        ));
        self.collector = Some(Arc::clone(&collector));

        if config.monitoring.enabled {
            collector.start().await;
        } else {
            info!("Temperature collection disabled, start it through the API");
        }

        self.start_connection_watcher(plc.clone());

        if config.watchdog.enabled {
            self.start_watchdog(&endpoint, WatchdogSettings::from(&config.watchdog));
        }

        if config.web.enabled {
            let monitor = MonitorState {
                collector,
                log,
                analyzer: Arc::new(TemperatureAnalyzer::new(&config.analyzer)),
            };
            self.start_web_server(config, plc, monitor).await?;
        }

        Ok(())
    }

    /// Start the Rocket API server
    async fn start_web_server(
        &mut self,
        config: &Config,
        plc: SharedPlc,
        monitor: MonitorState,
    ) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.web.address, config.web.port
        );

        let figment = rocket_figment(&config.web)?;
        let rocket = build_rocket(figment, plc, config.variables.clone(), monitor)?;
        let ignited = rocket.ignite().await?;
        self.web_shutdown = Some(ignited.shutdown());

        let task = tokio::spawn(async move {
            ignited.launch().await?;
            Ok::<(), anyhow::Error>(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Periodically refresh the shared link status
    fn start_connection_watcher(&mut self, plc: SharedPlc) {
        debug!("Starting PLC connection watcher");

        let running = Arc::clone(&self.running);
        let wake = Arc::clone(&self.wake);
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                let status = plc.check_connection().await;
                if !status.connected {
                    debug!(
                        "PLC not reachable: {}",
                        status.error.as_deref().unwrap_or("unknown error")
                    );
                }
                tokio::select! {
                    _ = time::sleep(CONNECTION_CHECK_PERIOD) => {}
                    _ = wake.notified() => {}
                }
            }
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Start the PLC heartbeat on its own connection
    fn start_watchdog(&mut self, endpoint: &PlcEndpoint, settings: WatchdogSettings) {
        let watchdog = Watchdog::new(endpoint, settings);
        let running = Arc::clone(&self.running);
        let task = tokio::spawn(async move {
            watchdog.run(running).await;
            Ok(())
        });
        self.tasks.push(task);
    }

    /// Ask every task to stop
    ///
    /// The collector is stopped and the PLC link closed before returning.
    pub async fn shutdown(&mut self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();

        if let Some(collector) = &self.collector {
            collector.stop().await;
        }
        if let Some(shutdown) = self.web_shutdown.take() {
            shutdown.notify();
        }
        if let Some(plc) = &self.plc {
            plc.close().await;
        }
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}
