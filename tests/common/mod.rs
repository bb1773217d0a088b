//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use socksd::config::ConnectionConfig;
use socksd::lifecycle::Shutdown;
use socksd::net::{ConnectionId, IdleTimeoutStream, Listener, ListenerError};
use socksd::protocol::{BoxError, ErrorCallback, ProtocolHandler, Session};
use socksd::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Start a backend that echoes everything it reads.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Announces each connection, then echoes a single byte and finishes.
pub struct OneByteEcho {
    pub started: mpsc::UnboundedSender<ConnectionId>,
}

impl ProtocolHandler for OneByteEcho {
    async fn handle(
        &self,
        mut conn: IdleTimeoutStream<TcpStream>,
        session: Session,
    ) -> Result<(), BoxError> {
        let _ = self.started.send(session.id());
        let byte = conn.read_u8().await?;
        conn.write_u8(byte).await?;
        Ok(())
    }
}

/// Fails every connection with a fixed message.
pub struct AlwaysFails(pub &'static str);

impl ProtocolHandler for AlwaysFails {
    async fn handle(
        &self,
        _conn: IdleTimeoutStream<TcpStream>,
        _session: Session,
    ) -> Result<(), BoxError> {
        Err(self.0.into())
    }
}

/// Error callback forwarding rendered errors to a channel.
pub fn error_channel() -> (ErrorCallback, mpsc::UnboundedReceiver<(ConnectionId, String)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: ErrorCallback = Arc::new(move |id: ConnectionId, err: &(dyn Error + 'static)| {
        let _ = tx.send((id, err.to_string()));
    });
    (callback, rx)
}

pub struct RunningServer<H> {
    pub server: Arc<Server<H>>,
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ListenerError>>,
}

/// Serve `server` on an ephemeral loopback port.
pub async fn start_server<H: ProtocolHandler>(server: Server<H>) -> RunningServer<H> {
    let listener = Listener::bind("127.0.0.1:0", 64).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(server);
    let shutdown = Shutdown::new();

    let task = {
        let server = Arc::clone(&server);
        let signal = shutdown.subscribe();
        tokio::spawn(async move { server.serve(listener, signal).await })
    };

    RunningServer {
        server,
        addr,
        shutdown,
        task,
    }
}

pub fn connection_config() -> ConnectionConfig {
    ConnectionConfig {
        accept_retry_delay_ms: 10,
        ..ConnectionConfig::default()
    }
}

/// A loopback port nothing is listening on right now.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
