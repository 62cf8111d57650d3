// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature sampling loop
//!
//! The collector is a two-state machine (`Stopped`, `Running`). While running,
//! a background task executes one cycle per interval:
//!
//! 1. open a fresh connection from the transport factory
//! 2. read the `REAL` temperature
//! 3. compute the rate of change against the last good sample and classify it
//! 4. append the reading to the log
//! 5. close the connection on every exit path
//!
//! A failed cycle is logged and skipped; it never ends the loop and never
//! resets the baseline. Scheduling is fixed-rate: ticks are measured from the
//! loop start and a tick missed by a slow cycle is skipped, so delays do not
//! accumulate. A stop request interrupts the wait between cycles but never a
//! cycle in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::session::SamplingSession;
use super::store::{Reading, ReadingLog};
use crate::config::MonitoringConfig;
use crate::modbus::{PlcClient, PlcError, TransportFactory};
use crate::utility::timestamp;

/// Sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSettings {
    /// Zero-based holding register of the temperature `REAL`
    pub address: u16,
    pub interval: Duration,
    /// Anomaly threshold in °C/s
    pub anomaly_threshold: f64,
    /// How long `stop` waits for the loop to exit
    pub stop_timeout: Duration,
}

impl From<&MonitoringConfig> for CollectorSettings {
    fn from(config: &MonitoringConfig) -> Self {
        Self {
            address: config.temperature_address,
            interval: Duration::from_secs(config.interval_secs),
            anomaly_threshold: config.anomaly_threshold,
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
        }
    }
}

struct Worker {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Periodic temperature collector with rate-of-change anomaly detection
pub struct TemperatureCollector<F: TransportFactory, L: ReadingLog> {
    factory: Arc<F>,
    log: Arc<L>,
    settings: CollectorSettings,
    worker: Mutex<Option<Worker>>,
}

impl<F: TransportFactory, L: ReadingLog> TemperatureCollector<F, L> {
    pub fn new(factory: F, log: Arc<L>, settings: CollectorSettings) -> Self {
        info!(
            "Temperature collector ready: HR {}, every {:?}, threshold {} °C/s",
            settings.address, settings.interval, settings.anomaly_threshold
        );
        Self {
            factory: Arc::new(factory),
            log,
            settings,
            worker: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// Start sampling in the background
    ///
    /// Returns `false` when the loop was already running.
    pub async fn start(&self) -> bool {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            info!("Temperature collector already running");
            return false;
        }

        let running = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());
        let handle = tokio::spawn(sampling_loop(
            Arc::clone(&self.factory),
            Arc::clone(&self.log),
            self.settings.clone(),
            Arc::clone(&running),
            Arc::clone(&wake),
        ));
        *worker = Some(Worker {
            running,
            wake,
            handle,
        });
        info!("Temperature collection started");
        true
    }

    /// Stop sampling
    ///
    /// A cycle in progress is allowed to finish. Waits at most the configured
    /// stop timeout for the loop to exit. Returns `false` when it was not
    /// running.
    pub async fn stop(&self) -> bool {
        let Some(mut worker) = self.worker.lock().await.take() else {
            return false;
        };
        worker.running.store(false, Ordering::SeqCst);
        worker.wake.notify_one();

        match time::timeout(self.settings.stop_timeout, &mut worker.handle).await {
            Ok(Ok(())) => info!("Temperature collection stopped"),
            Ok(Err(err)) => error!("Temperature collection task failed: {}", err),
            Err(_) => warn!(
                "Temperature collection did not stop within {:?}, detaching it",
                self.settings.stop_timeout
            ),
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|w| w.running.load(Ordering::SeqCst) && !w.handle.is_finished())
    }

    /// Execute one sampling cycle against `session`
    ///
    /// Returns the stored reading, or `None` when the PLC could not be read.
    pub async fn run_cycle(&self, session: &mut SamplingSession) -> Option<Reading> {
        sample(&*self.factory, &*self.log, self.settings.address, session).await
    }

    /// A fresh session using this collector's interval and threshold
    pub fn new_session(&self) -> SamplingSession {
        SamplingSession::new(self.settings.interval, self.settings.anomaly_threshold)
    }
}

async fn sampling_loop<F: TransportFactory, L: ReadingLog>(
    factory: Arc<F>,
    log: Arc<L>,
    settings: CollectorSettings,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
) {
    let mut session = SamplingSession::new(settings.interval, settings.anomaly_threshold);
    let mut ticker = time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wake.notified() => {}
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }
        sample(&*factory, &*log, settings.address, &mut session).await;
    }
    debug!("Sampling loop exited");
}

async fn sample<F: TransportFactory, L: ReadingLog>(
    factory: &F,
    log: &L,
    address: u16,
    session: &mut SamplingSession,
) -> Option<Reading> {
    let temperature = match read_temperature(factory, address).await {
        Ok(temperature) => temperature,
        Err(err) => {
            warn!("Failed to read temperature: {}", err);
            return None;
        }
    };

    let observation = session.observe(temperature);
    let reading = Reading {
        timestamp: timestamp::now(),
        temperature: observation.temperature,
        anomaly: observation.anomaly,
        rate_of_change: observation.rate_of_change,
    };

    if reading.anomaly {
        warn!(
            "Temperature anomaly: {:.2}°C ({:+.2}°C/s)",
            reading.temperature, reading.rate_of_change
        );
    }
    if let Err(err) = log.append(&reading).await {
        error!("Failed to store reading: {}", err);
    }
    Some(reading)
}

/// Read the temperature over a connection opened for this cycle only
async fn read_temperature<F: TransportFactory>(factory: &F, address: u16) -> Result<f32, PlcError> {
    let mut client = PlcClient::new(factory.create());
    let result = async {
        client.connect().await?;
        client.read_real(address).await
    }
    .await;
    client.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::codec;
    use crate::modbus::transport::{MockTransport, Transport};
    use crate::monitoring::store::{SqliteReadingLog, StoreError};
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    /// Hands out queued transports, then transports that refuse to connect
    struct ScriptedFactory {
        queue: StdMutex<VecDeque<MockTransport>>,
    }

    impl ScriptedFactory {
        fn new(transports: Vec<MockTransport>) -> Self {
            Self {
                queue: StdMutex::new(transports.into()),
            }
        }
    }

    impl TransportFactory for ScriptedFactory {
        type Transport = MockTransport;

        fn create(&self) -> MockTransport {
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(unreachable_plc)
        }
    }

    fn reading_plc(value: f32) -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_connect().times(1).returning(|| Ok(()));
        transport
            .expect_read_registers()
            .times(1)
            .returning(move |_, _| Ok(codec::encode_float32(value).to_vec()));
        transport.expect_close().times(1).return_const(());
        transport
    }

    fn unreachable_plc() -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .returning(|| Err(PlcError::Connection("connection refused".into())));
        transport.expect_read_registers().never();
        transport.expect_close().times(1).return_const(());
        transport
    }

    fn settings(interval: Duration) -> CollectorSettings {
        CollectorSettings {
            address: 1,
            interval,
            anomaly_threshold: 0.4,
            stop_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_skipped_cycle_keeps_baseline() {
        let factory = ScriptedFactory::new(vec![
            reading_plc(25.0),
            unreachable_plc(),
            reading_plc(27.1),
        ]);
        let log = Arc::new(SqliteReadingLog::in_memory().await.unwrap());
        let collector =
            TemperatureCollector::new(factory, Arc::clone(&log), settings(Duration::from_secs(5)));
        let mut session = collector.new_session();

        let first = collector.run_cycle(&mut session).await.unwrap();
        assert!(!first.anomaly);
        assert!(collector.run_cycle(&mut session).await.is_none());
        assert_eq!(session.last(), Some(25.0));

        let third = collector.run_cycle(&mut session).await.unwrap();
        assert!(third.anomaly);
        assert!((third.rate_of_change - 0.42).abs() < 1e-5);

        let stored = log.latest(10).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|r| r.anomaly && r.temperature == 27.1));
    }

    #[tokio::test]
    async fn test_read_error_closes_connection() {
        let mut transport = MockTransport::new();
        transport.expect_connect().returning(|| Ok(()));
        transport
            .expect_read_registers()
            .returning(|_, _| Err(PlcError::Protocol("Illegal data address".into())));
        transport.expect_close().times(1).return_const(());

        let log = Arc::new(SqliteReadingLog::in_memory().await.unwrap());
        let collector = TemperatureCollector::new(
            ScriptedFactory::new(vec![transport]),
            Arc::clone(&log),
            settings(Duration::from_secs(5)),
        );
        let mut session = collector.new_session();
        assert!(collector.run_cycle(&mut session).await.is_none());
        assert!(log.current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let log = Arc::new(SqliteReadingLog::in_memory().await.unwrap());
        let collector = TemperatureCollector::new(
            ScriptedFactory::new(vec![]),
            log,
            settings(Duration::from_millis(20)),
        );

        assert!(!collector.is_running().await);
        assert!(collector.start().await);
        assert!(!collector.start().await);
        assert!(collector.is_running().await);

        time::sleep(Duration::from_millis(70)).await;
        assert!(collector.is_running().await);

        assert!(collector.stop().await);
        assert!(!collector.is_running().await);
        assert!(!collector.stop().await);

        // Restart after a stop begins a new run
        assert!(collector.start().await);
        assert!(collector.stop().await);
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_interval() {
        let log = Arc::new(SqliteReadingLog::in_memory().await.unwrap());
        let collector = TemperatureCollector::new(
            ScriptedFactory::new(vec![]),
            log,
            settings(Duration::from_secs(3600)),
        );
        assert!(collector.start().await);
        time::sleep(Duration::from_millis(20)).await;

        let started = std::time::Instant::now();
        assert!(collector.stop().await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    /// Keeps readings in memory so the clock only moves on timers
    #[derive(Default)]
    struct MemoryLog {
        readings: StdMutex<Vec<Reading>>,
    }

    #[async_trait]
    impl ReadingLog for MemoryLog {
        async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
            self.readings.lock().unwrap().push(reading.clone());
            Ok(())
        }

        async fn latest(&self, n: u32) -> Result<Vec<Reading>, StoreError> {
            let readings = self.readings.lock().unwrap();
            let start = readings.len().saturating_sub(n as usize);
            Ok(readings[start..].to_vec())
        }

        async fn in_range(&self, since: NaiveDateTime) -> Result<Vec<Reading>, StoreError> {
            let readings = self.readings.lock().unwrap();
            Ok(readings.iter().filter(|r| r.timestamp >= since).cloned().collect())
        }
    }

    /// Records when each cycle connects and answers after `delay`
    struct PacedTransport {
        starts: Arc<StdMutex<Vec<Instant>>>,
        delay: Duration,
        connected: bool,
    }

    #[async_trait]
    impl Transport for PacedTransport {
        async fn connect(&mut self) -> Result<(), PlcError> {
            self.starts.lock().unwrap().push(Instant::now());
            self.connected = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn read_registers(&mut self, _address: u16, _count: u16) -> Result<Vec<u16>, PlcError> {
            time::sleep(self.delay).await;
            Ok(codec::encode_float32(21.5).to_vec())
        }

        async fn write_registers(&mut self, _address: u16, _words: &[u16]) -> Result<(), PlcError> {
            Ok(())
        }

        async fn read_coil(&mut self, _address: u16) -> Result<bool, PlcError> {
            Ok(false)
        }

        async fn write_coil(&mut self, _address: u16, _value: bool) -> Result<(), PlcError> {
            Ok(())
        }

        async fn close(&mut self) {
            self.connected = false;
        }
    }

    /// Every cycle is instant except `slow_cycle`, which takes `slow`
    struct PacedFactory {
        starts: Arc<StdMutex<Vec<Instant>>>,
        cycles: AtomicUsize,
        slow_cycle: usize,
        slow: Duration,
    }

    impl TransportFactory for PacedFactory {
        type Transport = PacedTransport;

        fn create(&self) -> PacedTransport {
            let cycle = self.cycles.fetch_add(1, Ordering::SeqCst);
            PacedTransport {
                starts: Arc::clone(&self.starts),
                delay: if cycle == self.slow_cycle {
                    self.slow
                } else {
                    Duration::ZERO
                },
                connected: false,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_keeps_fixed_rate() {
        let starts = Arc::new(StdMutex::new(Vec::new()));
        let factory = PacedFactory {
            starts: Arc::clone(&starts),
            cycles: AtomicUsize::new(0),
            slow_cycle: 1,
            slow: Duration::from_secs(25),
        };
        let log = Arc::new(MemoryLog::default());
        let collector =
            TemperatureCollector::new(factory, Arc::clone(&log), settings(Duration::from_secs(10)));

        let origin = Instant::now();
        assert!(collector.start().await);
        time::sleep(Duration::from_secs(55)).await;
        assert!(collector.stop().await);

        let offsets: Vec<u64> = starts
            .lock()
            .unwrap()
            .iter()
            .map(|start| start.duration_since(origin).as_secs())
            .collect();
        // The cycle at 10s ends at 35s: the missed 20s and 30s ticks collapse
        // into one immediate cycle, then the 10s grid resumes
        assert_eq!(offsets, vec![0, 10, 35, 40, 50]);
        assert_eq!(log.latest(10).await.unwrap().len(), 5);
    }
}
