// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests of the typed PLC client against the in-process mock PLC
//!
//! A mock PLC is started on a random port for each test and accessed through
//! the real Modbus/TCP transport.

use std::net::SocketAddr;
use std::time::Duration;

use rust_plc_monitor::modbus::{
    MockPlcServer, PlcClient, PlcEndpoint, PlcError, SharedPlc, TcpTransport, Transport, TypedValue,
    VariableKind,
};

/// Start a mock PLC on a port chosen by the OS
async fn start_test_server() -> (MockPlcServer, SocketAddr) {
    let plc = MockPlcServer::new();
    let (address, _handle) = plc
        .clone()
        .spawn("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    (plc, address)
}

fn endpoint(address: SocketAddr) -> PlcEndpoint {
    PlcEndpoint {
        address: address.ip().to_string(),
        port: address.port(),
        unit_id: 1,
        timeout: Duration::from_secs(2),
    }
}

/// A local port nobody listens on
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_bool_int_real_sequence() {
    let (plc, address) = start_test_server().await;
    let mut client = PlcClient::new(TcpTransport::new(endpoint(address)));
    client.connect().await.unwrap();
    assert!(client.is_connected());

    assert!(!client.read_bool(0).await.unwrap());
    client.write_bool(0, true).await.unwrap();
    assert!(client.read_bool(0).await.unwrap());
    assert_eq!(plc.coil(0), Some(true));

    client.write_int(0, 1234).await.unwrap();
    assert_eq!(client.read_int(0).await.unwrap(), 1234);
    client.write_int(0, -2).await.unwrap();
    assert_eq!(plc.register(0), Some(0xFFFE));
    assert_eq!(client.read_int(0).await.unwrap(), -2);

    client.write_real(1, 75.5).await.unwrap();
    assert_eq!(plc.register(1), Some(0x4297));
    assert_eq!(plc.register(2), Some(0x0000));
    assert_eq!(client.read_real(1).await.unwrap(), 75.5);

    client.close().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_int_out_of_range_writes_nothing() {
    let (plc, address) = start_test_server().await;
    plc.set_register(0, 7);
    let mut client = PlcClient::new(TcpTransport::new(endpoint(address)));
    client.connect().await.unwrap();

    let err = client.write_int(0, 32768).await.unwrap_err();
    assert!(matches!(err, PlcError::Codec(_)));
    assert_eq!(plc.register(0), Some(7));
    client.close().await;
}

#[tokio::test]
async fn test_exception_response_is_protocol_error() {
    let (_plc, address) = start_test_server().await;
    let mut client = PlcClient::new(TcpTransport::new(endpoint(address)));
    client.connect().await.unwrap();

    // The REAL would span registers 99 and 100; the simulator has 100
    let err = client.read_real(99).await.unwrap_err();
    assert!(matches!(err, PlcError::Protocol(_)), "got {err:?}");
    assert!(!err.is_connection_error());

    // The link is still usable after an exception response
    client.write_int(5, 1).await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn test_connect_refused() {
    let port = closed_port().await;
    let mut client = PlcClient::new(TcpTransport::new(PlcEndpoint::new("127.0.0.1", port)));
    let err = client.connect().await.unwrap_err();
    assert!(err.is_connection_error(), "got {err:?}");
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_shared_link_reads_and_writes() {
    let (plc, address) = start_test_server().await;
    plc.set_real(1, 21.25);
    let shared = SharedPlc::new(endpoint(address));

    assert!(!shared.status().await.connected);
    assert_eq!(
        shared.read(VariableKind::Real, 1).await.unwrap(),
        TypedValue::Real(21.25)
    );
    let status = shared.status().await;
    assert!(status.connected);
    assert!(status.last_check.is_some());
    assert_eq!(status.error, None);

    shared.write(3, TypedValue::Int(-7)).await.unwrap();
    assert_eq!(plc.register(3), Some((-7i16) as u16));
    shared.write(2, TypedValue::Bool(true)).await.unwrap();
    assert_eq!(plc.coil(2), Some(true));

    // Concurrent users are serialized on the one link
    let tasks: Vec<_> = (0..8u16)
        .map(|i| {
            let shared = shared.clone();
            tokio::spawn(async move {
                shared.write(10 + i, TypedValue::Int(i as i16)).await.unwrap();
                shared.read(VariableKind::Int, 10 + i).await.unwrap()
            })
        })
        .collect();
    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), TypedValue::Int(i as i16));
    }

    shared.close().await;
    assert!(!shared.status().await.connected);
}

#[tokio::test]
async fn test_shared_link_retarget() {
    let (_first, first_address) = start_test_server().await;
    let (second, second_address) = start_test_server().await;
    second.set_register(0, 42);

    let shared = SharedPlc::new(endpoint(first_address));
    assert_eq!(
        shared.read(VariableKind::Int, 0).await.unwrap(),
        TypedValue::Int(0)
    );

    shared.retarget(endpoint(second_address)).await.unwrap();
    assert_eq!(shared.target().await.port, second_address.port());
    assert_eq!(
        shared.read(VariableKind::Int, 0).await.unwrap(),
        TypedValue::Int(42)
    );

    // An unreachable target is kept and reported
    let port = closed_port().await;
    assert!(shared
        .retarget(PlcEndpoint::new("127.0.0.1", port))
        .await
        .is_err());
    assert_eq!(shared.target().await.port, port);
    let status = shared.status().await;
    assert!(!status.connected);
    assert!(status.error.is_some());

    let err = shared.read(VariableKind::Int, 0).await.unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_check_connection_reconnects() {
    let (_plc, address) = start_test_server().await;
    let shared = SharedPlc::new(endpoint(address));
    assert!(shared.check_connection().await.connected);
    shared.close().await;
    assert!(shared.check_connection().await.connected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transport_runs_on_spawned_tasks() {
    let (plc, address) = start_test_server().await;
    plc.set_register(0, 7);

    // The connect and exchange futures must be Send to run on the worker pool
    let handle = tokio::spawn(async move {
        let mut transport = TcpTransport::new(endpoint(address));
        transport.connect().await?;
        let words = transport.read_registers(0, 1).await?;
        transport.close().await;
        Ok::<_, PlcError>(words)
    });
    assert_eq!(handle.await.unwrap().unwrap(), vec![7]);
}
