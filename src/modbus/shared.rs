// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared PLC connection
//!
//! [`SharedPlc`] is a connection pool of one: a single [`PlcClient`] behind a
//! single async mutex. Every exchange holds the lock for its whole duration,
//! including any reconnect, and the guard is released on every exit path when
//! it goes out of scope.
//!
//! A connection-class failure (dropped link, timeout) closes the link,
//! reconnects and retries the exchange exactly once. Protocol and codec errors
//! are returned as they are.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveDateTime;
use log::{info, warn};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use super::client::PlcClient;
use super::error::PlcError;
use super::transport::{PlcEndpoint, TransportFactory};
use super::value::{TypedValue, VariableKind};
use crate::utility::timestamp;

/// Future returned by an exchange closure
pub type ExchangeFuture<'a, R> = Pin<Box<dyn Future<Output = Result<R, PlcError>> + Send + 'a>>;

/// Last known state of the shared link
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Local time of the last exchange or connection check
    #[serde(with = "timestamp::local_seconds_option")]
    #[schemars(with = "Option<String>")]
    pub last_check: Option<NaiveDateTime>,
    /// Message of the last connection failure
    pub error: Option<String>,
}

struct Link<F: TransportFactory> {
    target: F,
    client: PlcClient<F::Transport>,
}

/// One PLC link shared by concurrent callers
pub struct SharedPlc<F: TransportFactory = PlcEndpoint> {
    link: Arc<Mutex<Link<F>>>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl<F: TransportFactory> Clone for SharedPlc<F> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
            status: Arc::clone(&self.status),
        }
    }
}

impl<F: TransportFactory> SharedPlc<F> {
    /// Create a shared link to `target`. No connection is made until the
    /// first exchange.
    pub fn new(target: F) -> Self {
        let client = PlcClient::new(target.create());
        Self {
            link: Arc::new(Mutex::new(Link { target, client })),
            status: Arc::new(RwLock::new(ConnectionStatus::default())),
        }
    }

    /// Read a typed variable
    pub async fn read(&self, kind: VariableKind, address: u16) -> Result<TypedValue, PlcError> {
        self.exchange(move |client| Box::pin(client.read_value(kind, address)))
            .await
    }

    /// Write a typed variable
    pub async fn write(&self, address: u16, value: TypedValue) -> Result<(), PlcError> {
        self.exchange(move |client| Box::pin(client.write_value(address, value)))
            .await
    }

    /// Run one exchange with exclusive use of the link
    ///
    /// The link is (re)connected first when needed. A connection-class
    /// failure is retried once on a fresh link.
    pub async fn exchange<R, Op>(&self, op: Op) -> Result<R, PlcError>
    where
        Op: for<'a> Fn(&'a mut PlcClient<F::Transport>) -> ExchangeFuture<'a, R>,
    {
        let mut link = self.link.lock().await;

        let result = match Self::attempt(&mut link.client, &op).await {
            Err(err) if err.is_connection_error() => {
                warn!("PLC exchange failed ({}), reconnecting and retrying once", err);
                link.client.close().await;
                Self::attempt(&mut link.client, &op).await
            }
            other => other,
        };

        if let Err(err) = &result {
            if err.is_connection_error() {
                link.client.close().await;
            }
        }
        self.record(link.client.is_connected(), result.as_ref().err())
            .await;
        result
    }

    async fn attempt<R, Op>(client: &mut PlcClient<F::Transport>, op: &Op) -> Result<R, PlcError>
    where
        Op: for<'a> Fn(&'a mut PlcClient<F::Transport>) -> ExchangeFuture<'a, R>,
    {
        if !client.is_connected() {
            client.connect().await?;
        }
        op(client).await
    }

    /// Make sure the link is up, connecting if needed, and refresh the status
    pub async fn check_connection(&self) -> ConnectionStatus {
        let mut link = self.link.lock().await;
        let outcome = if link.client.is_connected() {
            Ok(())
        } else {
            link.client.connect().await
        };
        self.record(link.client.is_connected(), outcome.as_ref().err())
            .await;
        self.status().await
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    /// Point the link at another PLC
    ///
    /// The current link is closed and a connection to the new target is
    /// attempted. The new target is kept even when that attempt fails.
    pub async fn retarget(&self, target: F) -> Result<(), PlcError> {
        let mut link = self.link.lock().await;
        let transport = target.create();
        link.client.replace_transport(transport).await;
        link.target = target;
        info!("PLC link retargeted");

        let outcome = link.client.connect().await;
        self.record(link.client.is_connected(), outcome.as_ref().err())
            .await;
        outcome
    }

    /// Close the link. The next exchange reconnects.
    pub async fn close(&self) {
        let mut link = self.link.lock().await;
        link.client.close().await;
        self.record(false, None).await;
    }

    async fn record(&self, connected: bool, error: Option<&PlcError>) {
        let mut status = self.status.write().await;
        status.connected = connected;
        status.last_check = Some(timestamp::now());
        match error {
            Some(err) if err.is_connection_error() => status.error = Some(err.to_string()),
            Some(_) => {}
            None => {
                if connected {
                    status.error = None;
                }
            }
        }
    }
}

impl<F: TransportFactory + Clone> SharedPlc<F> {
    /// Currently configured target
    pub async fn target(&self) -> F {
        self.link.lock().await.target.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::transport::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Factory handing out pre-programmed mock transports
    struct MockFactory {
        build: Box<dyn Fn() -> MockTransport + Send + Sync>,
    }

    impl TransportFactory for MockFactory {
        type Transport = MockTransport;

        fn create(&self) -> MockTransport {
            (self.build)()
        }
    }

    fn factory(build: impl Fn() -> MockTransport + Send + Sync + 'static) -> MockFactory {
        MockFactory {
            build: Box::new(build),
        }
    }

    #[tokio::test]
    async fn test_connection_error_is_retried_once() {
        let plc = SharedPlc::new(factory(|| {
            let connected = Arc::new(AtomicUsize::new(0));
            let mut transport = MockTransport::new();
            let c = Arc::clone(&connected);
            transport
                .expect_is_connected()
                .returning(move || c.load(Ordering::SeqCst) == 1);
            let c = Arc::clone(&connected);
            transport.expect_connect().times(2).returning(move || {
                c.store(1, Ordering::SeqCst);
                Ok(())
            });
            let c = Arc::clone(&connected);
            transport.expect_close().returning(move || {
                c.store(0, Ordering::SeqCst);
            });
            let mut calls = 0;
            transport.expect_read_registers().times(2).returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Err(PlcError::Connection("reset by peer".into()))
                } else {
                    Ok(vec![0x41C8, 0x0000])
                }
            });
            transport
        }));

        let value = plc.read(VariableKind::Real, 1).await.unwrap();
        assert_eq!(value, TypedValue::Real(25.0));
        let status = plc.status().await;
        assert!(status.connected);
        assert!(status.error.is_none());
        assert!(status.last_check.is_some());
    }

    #[tokio::test]
    async fn test_protocol_error_is_not_retried() {
        let plc = SharedPlc::new(factory(|| {
            let mut transport = MockTransport::new();
            transport.expect_is_connected().return_const(true);
            transport.expect_close().never();
            transport
                .expect_read_coil()
                .times(1)
                .returning(|_| Err(PlcError::Protocol("Illegal data address".into())));
            transport
        }));

        let err = plc.read(VariableKind::Bool, 500).await.unwrap_err();
        assert!(matches!(err, PlcError::Protocol(_)));
        assert!(plc.status().await.connected);
    }

    #[tokio::test]
    async fn test_second_failure_is_reported() {
        let plc = SharedPlc::new(factory(|| {
            let mut transport = MockTransport::new();
            transport.expect_is_connected().return_const(false);
            transport
                .expect_connect()
                .times(2)
                .returning(|| Err(PlcError::Timeout(Duration::from_secs(3))));
            transport.expect_close().return_const(());
            transport
        }));

        let err = plc.write(0, TypedValue::Bool(true)).await.unwrap_err();
        assert!(err.is_connection_error());
        let status = plc.status().await;
        assert!(!status.connected);
        assert!(status.error.is_some());
    }
}
