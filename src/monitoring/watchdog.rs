// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PLC heartbeat
//!
//! The PLC program watches an `INT` register and raises a fault when it stops
//! changing. The watchdog reads it, adds one and writes it back every period,
//! wrapping to 0 above the rollover value. It keeps its own connection and
//! reconnects after a failure once the retry delay has passed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time;

use crate::config::WatchdogConfig;
use crate::modbus::{PlcClient, PlcError, TransportFactory};

/// Delay before reconnecting after a failed heartbeat
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogSettings {
    /// Zero-based holding register of the heartbeat counter
    pub address: u16,
    pub period: Duration,
    /// Highest value written before wrapping to 0
    pub rollover: i16,
}

impl From<&WatchdogConfig> for WatchdogSettings {
    fn from(config: &WatchdogConfig) -> Self {
        Self {
            address: config.address,
            period: Duration::from_millis(config.period_ms),
            rollover: config.rollover,
        }
    }
}

/// Next counter value after `current`
pub fn next_heartbeat(current: i16, rollover: i16) -> i16 {
    match current.checked_add(1) {
        Some(next) if next <= rollover => next,
        _ => 0,
    }
}

pub struct Watchdog<F: TransportFactory> {
    client: PlcClient<F::Transport>,
    settings: WatchdogSettings,
}

impl<F: TransportFactory> Watchdog<F> {
    pub fn new(factory: &F, settings: WatchdogSettings) -> Self {
        Self {
            client: PlcClient::new(factory.create()),
            settings,
        }
    }

    /// Increment the counter once, connecting first if needed
    pub async fn beat(&mut self) -> Result<i16, PlcError> {
        if !self.client.is_connected() {
            self.client.connect().await?;
            info!("Watchdog connected");
        }
        let current = self.client.read_int(self.settings.address).await?;
        let next = next_heartbeat(current, self.settings.rollover);
        self.client
            .write_int(self.settings.address, i64::from(next))
            .await?;
        debug!("Watchdog heartbeat {}", next);
        Ok(next)
    }

    /// Beat until `running` is cleared
    pub async fn run(mut self, running: Arc<AtomicBool>) {
        info!(
            "Watchdog started on HR {} every {:?}",
            self.settings.address, self.settings.period
        );
        while running.load(Ordering::SeqCst) {
            match self.beat().await {
                Ok(_) => time::sleep(self.settings.period).await,
                Err(err) => {
                    warn!("Watchdog heartbeat failed: {}, retrying in {:?}", err, RETRY_DELAY);
                    self.client.close().await;
                    time::sleep(RETRY_DELAY).await;
                }
            }
        }
        self.client.close().await;
        info!("Watchdog stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::transport::MockTransport;
    use mockall::predicate::eq;

    struct OneShot(std::sync::Mutex<Option<MockTransport>>);

    impl TransportFactory for OneShot {
        type Transport = MockTransport;

        fn create(&self) -> MockTransport {
            self.0.lock().unwrap().take().unwrap()
        }
    }

    #[test]
    fn test_next_heartbeat_wraps() {
        assert_eq!(next_heartbeat(0, 30000), 1);
        assert_eq!(next_heartbeat(29999, 30000), 30000);
        assert_eq!(next_heartbeat(30000, 30000), 0);
        assert_eq!(next_heartbeat(i16::MAX, i16::MAX), 0);
        assert_eq!(next_heartbeat(-3, 30000), -2);
    }

    #[tokio::test]
    async fn test_beat_reads_increments_and_writes() {
        let mut transport = MockTransport::new();
        transport.expect_is_connected().return_const(false);
        transport.expect_connect().times(1).returning(|| Ok(()));
        transport
            .expect_read_registers()
            .with(eq(3), eq(1))
            .returning(|_, _| Ok(vec![41]));
        transport
            .expect_write_registers()
            .withf(|address, words| *address == 3 && words.to_vec() == vec![42])
            .times(1)
            .returning(|_, _| Ok(()));

        let factory = OneShot(std::sync::Mutex::new(Some(transport)));
        let mut watchdog = Watchdog::new(
            &factory,
            WatchdogSettings {
                address: 3,
                period: Duration::from_millis(500),
                rollover: 30000,
            },
        );
        assert_eq!(watchdog.beat().await.unwrap(), 42);
    }
}
