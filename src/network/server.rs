//! TCP server: accept loop and per-connection request handling
//!
//! One tokio task per connection. Each task reads length-prefixed request
//! frames into a buffer, dispatches every complete frame through the
//! command registry, and writes back the framed tagged responses. Command
//! failures become tagged `err` responses; framing failures close only the
//! offending connection.

use crate::commands::{CommandRegistry, ParsedCommand};
use crate::config::Config;
use crate::error::{Result, ScoreKvError};
use crate::network::connection::{ConnectionInfo, ConnectionPool};
use crate::network::protocol;
use crate::storage::MemoryStore;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// TCP server for handling client connections
pub struct TcpServer {
    config: Arc<Config>,
    storage: Arc<MemoryStore>,
    registry: Arc<CommandRegistry>,
    pool: Arc<ConnectionPool>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl TcpServer {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<MemoryStore>,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        let pool = Arc::new(ConnectionPool::new(config.server.max_connections));
        Self {
            config,
            storage,
            registry,
            pool,
            shutdown_tx: None,
        }
    }

    pub fn connection_pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Bind and serve until shutdown is signalled.
    pub async fn start(&mut self) -> Result<()> {
        let listener = self.bind().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());
        self.run_accept_loop(listener, shutdown_tx).await
    }

    /// Bind, spawn the accept loop in the background, and return the bound
    /// address. Used by tests and embedding code; port 0 picks a free port.
    pub async fn start_with_addr(&mut self) -> Result<SocketAddr> {
        let listener = self.bind().await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ScoreKvError::NetworkError {
                message: format!("Failed to get local address: {e}"),
                source: Some(Box::new(e)),
                connection_id: None,
            })?;

        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        let mut background = TcpServer {
            config: Arc::clone(&self.config),
            storage: Arc::clone(&self.storage),
            registry: Arc::clone(&self.registry),
            pool: Arc::clone(&self.pool),
            shutdown_tx: Some(shutdown_tx.clone()),
        };
        tokio::spawn(async move {
            if let Err(e) = background.run_accept_loop(listener, shutdown_tx).await {
                error!("server loop failed: {e}");
            }
        });

        Ok(local_addr)
    }

    /// Signal every connection handler and the accept loop to stop.
    pub fn shutdown(&self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(());
            info!("shutdown signal sent");
        }
    }

    async fn bind(&self) -> Result<TcpListener> {
        let bind_addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ScoreKvError::NetworkError {
                message: format!("Failed to bind to {bind_addr}: {e}"),
                source: Some(Box::new(e)),
                connection_id: None,
            })?;
        if let Ok(addr) = listener.local_addr() {
            info!("scorekv listening on {addr}");
        }
        Ok(listener)
    }

    async fn run_accept_loop(
        &mut self,
        listener: TcpListener,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<()> {
        let mut shutdown_rx = shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            self.handle_new_connection(stream, addr, shutdown_tx.subscribe());
                        }
                        Err(e) => {
                            error!("accept failed: {e}");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("accept loop stopping");
                    break;
                }
            }
        }

        self.drain_connections().await;
        info!("server stopped");
        Ok(())
    }

    fn handle_new_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        shutdown_rx: broadcast::Receiver<()>,
    ) {
        let client_id = Uuid::new_v4();
        if let Err(e) = self.pool.register(ConnectionInfo::new(client_id, addr)) {
            warn!("rejecting connection from {addr}: {e}");
            drop(stream);
            return;
        }

        if let Err(e) = stream.set_nodelay(self.config.network.tcp_nodelay) {
            debug!("failed to set TCP_NODELAY for {addr}: {e}");
        }

        info!(
            "client {client_id} connected from {addr} (active: {})",
            self.pool.active_connections()
        );

        let storage = Arc::clone(&self.storage);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);
        let pool = Arc::clone(&self.pool);

        tokio::spawn(async move {
            let result = Self::handle_connection(
                stream,
                client_id,
                storage,
                registry,
                config,
                shutdown_rx,
            )
            .await;

            match result {
                Ok(()) => info!("client {client_id} from {addr} disconnected"),
                Err(e) if e.is_client_error() => {
                    warn!("client {client_id} from {addr} closed on client error: {e}");
                }
                Err(e) => {
                    error!("client {client_id} from {addr} closed on server error: {e}");
                }
            }
            pool.release(client_id);
        });
    }

    async fn handle_connection(
        mut stream: TcpStream,
        client_id: Uuid,
        storage: Arc<MemoryStore>,
        registry: Arc<CommandRegistry>,
        config: Arc<Config>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut read_buf = BytesMut::with_capacity(4096);
        let read_timeout = Duration::from_secs(config.network.read_timeout);
        let write_timeout = Duration::from_secs(config.network.write_timeout);

        loop {
            tokio::select! {
                result = timeout(read_timeout, stream.read_buf(&mut read_buf)) => {
                    match result {
                        Ok(Ok(0)) => {
                            // Peer closed; any buffered partial frame is discarded
                            break;
                        }
                        Ok(Ok(n)) => {
                            debug!("read {n} bytes from client {client_id}");
                            let responses =
                                Self::process_frames(&mut read_buf, client_id, &storage, &registry)
                                    .await?;
                            if !responses.is_empty() {
                                Self::write_all(&mut stream, &responses, write_timeout).await?;
                            }
                        }
                        Ok(Err(e)) => {
                            return Err(ScoreKvError::NetworkError {
                                message: format!("read failed: {e}"),
                                source: Some(Box::new(e)),
                                connection_id: Some(client_id.to_string()),
                            });
                        }
                        Err(_) => {
                            warn!("client {client_id} idle past {read_timeout:?}, closing");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("client {client_id} closing for shutdown");
                    break;
                }
            }
        }

        let _ = stream.shutdown().await;
        Ok(())
    }

    /// Decode and dispatch every complete frame in the buffer, collecting
    /// the framed responses. A framing error aborts the connection; a
    /// command error is just another tagged response.
    async fn process_frames(
        read_buf: &mut BytesMut,
        client_id: Uuid,
        storage: &MemoryStore,
        registry: &CommandRegistry,
    ) -> Result<BytesMut> {
        let mut responses = BytesMut::new();

        loop {
            let args = match protocol::decode_request(read_buf) {
                Ok(Some(args)) => args,
                Ok(None) => break,
                Err(e) => {
                    return Err(ScoreKvError::ProtocolError {
                        message: e.to_string(),
                        source: Some(Box::new(e)),
                        connection_id: Some(client_id.to_string()),
                    });
                }
            };

            let value = match ParsedCommand::from_frame(args, client_id) {
                Ok(cmd) => {
                    debug!(
                        "client {client_id} command '{}' with {} args",
                        cmd.name,
                        cmd.args.len()
                    );
                    registry.execute(&cmd, storage).await.into_value()
                }
                Err(e) => e.into(),
            };
            protocol::encode_response(&value, &mut responses);
        }

        Ok(responses)
    }

    async fn write_all(
        stream: &mut TcpStream,
        data: &[u8],
        write_timeout: Duration,
    ) -> Result<()> {
        match timeout(write_timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ScoreKvError::NetworkError {
                message: format!("write failed: {e}"),
                source: Some(Box::new(e)),
                connection_id: None,
            }),
            Err(_) => Err(ScoreKvError::NetworkError {
                message: "write timeout".to_string(),
                source: None,
                connection_id: None,
            }),
        }
    }

    async fn drain_connections(&self) {
        let deadline = Duration::from_secs(10);
        let start = std::time::Instant::now();
        while self.pool.active_connections() > 0 {
            if start.elapsed() > deadline {
                warn!(
                    "drain timeout with {} connections still active",
                    self.pool.active_connections()
                );
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
