//! Accept loop, drain and per-connection error handling.

use std::time::Duration;

use socksd::config::ConnectionConfig;
use socksd::net::ServerState;
use socksd::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

mod common;

use common::{connection_config, error_channel, start_server, AlwaysFails, OneByteEcho};

#[tokio::test]
async fn shutdown_drains_in_flight_connections() {
    let (started_tx, mut started) = mpsc::unbounded_channel();
    let running = start_server(Server::new(
        OneByteEcho { started: started_tx },
        &connection_config(),
    ))
    .await;

    // three clients stuck mid-exchange
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(TcpStream::connect(running.addr).await.unwrap());
    }
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(2), started.recv())
            .await
            .expect("handler should start")
            .unwrap();
    }
    assert_eq!(running.server.active_connections(), 3);

    running.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // no new accepts, but the drain is still waiting
    assert!(TcpStream::connect(running.addr).await.is_err());
    assert_eq!(running.server.state(), ServerState::Draining);
    assert!(!running.task.is_finished());

    for (i, client) in clients.iter_mut().enumerate() {
        client.write_u8(i as u8).await.unwrap();
        assert_eq!(client.read_u8().await.unwrap(), i as u8);
    }

    tokio::time::timeout(Duration::from_secs(2), running.task)
        .await
        .expect("drain should finish once handlers return")
        .unwrap()
        .unwrap();
    assert_eq!(running.server.state(), ServerState::Stopped);
    assert_eq!(running.server.active_connections(), 0);
}

#[tokio::test]
async fn handler_errors_go_to_the_callback() {
    let (callback, mut errors) = error_channel();
    let server = Server::new(AlwaysFails("handshake rejected"), &connection_config())
        .with_error_callback(callback);
    let running = start_server(server).await;

    // the handler fails at once and linger 0 resets the socket, so the
    // client side may see its connect reset; only the callback matters here
    let _a = TcpStream::connect(running.addr).await;
    let _b = TcpStream::connect(running.addr).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (id, message) = tokio::time::timeout(Duration::from_secs(2), errors.recv())
            .await
            .expect("error should be reported")
            .unwrap();
        assert_eq!(message, "handshake rejected");
        ids.push(id);
    }
    assert_ne!(ids[0], ids[1]);

    // the server keeps going
    let _c = TcpStream::connect(running.addr).await;
    tokio::time::timeout(Duration::from_secs(2), errors.recv())
        .await
        .unwrap()
        .unwrap();

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn silent_client_hits_the_idle_deadline() {
    let (callback, mut errors) = error_channel();
    let (started_tx, mut started) = mpsc::unbounded_channel();
    let config = ConnectionConfig {
        idle_timeout_secs: 1,
        ..connection_config()
    };
    let server = Server::new(OneByteEcho { started: started_tx }, &config)
        .with_error_callback(callback);
    let running = start_server(server).await;

    let mut client = TcpStream::connect(running.addr).await.unwrap();
    started.recv().await.unwrap();

    let (_, message) = tokio::time::timeout(Duration::from_secs(3), errors.recv())
        .await
        .expect("idle deadline should fire")
        .unwrap();
    assert!(message.contains("idle"), "{message}");

    // the server side is gone: EOF or reset, never data
    let mut buf = [0u8; 1];
    match client.read(&mut buf).await {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
    }

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn connection_limit_holds_back_extra_clients() {
    let (started_tx, mut started) = mpsc::unbounded_channel();
    let running = {
        let listener = socksd::net::Listener::bind("127.0.0.1:0", 1).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::sync::Arc::new(Server::new(
            OneByteEcho { started: started_tx },
            &connection_config(),
        ));
        let shutdown = socksd::Shutdown::new();
        let task = {
            let server = std::sync::Arc::clone(&server);
            let signal = shutdown.subscribe();
            tokio::spawn(async move { server.serve(listener, signal).await })
        };
        common::RunningServer {
            server,
            addr,
            shutdown,
            task,
        }
    };

    let mut first = TcpStream::connect(running.addr).await.unwrap();
    let mut second = TcpStream::connect(running.addr).await.unwrap();
    started.recv().await.unwrap();

    // second sits in the backlog until the first finishes
    let waiting = tokio::time::timeout(Duration::from_millis(100), started.recv()).await;
    assert!(waiting.is_err());

    first.write_u8(1).await.unwrap();
    assert_eq!(first.read_u8().await.unwrap(), 1);
    drop(first);

    tokio::time::timeout(Duration::from_secs(2), started.recv())
        .await
        .expect("second client admitted")
        .unwrap();
    second.write_u8(2).await.unwrap();
    assert_eq!(second.read_u8().await.unwrap(), 2);

    running.shutdown.trigger();
    running.task.await.unwrap().unwrap();
}
