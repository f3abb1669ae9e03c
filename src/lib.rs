//! scorekv - an in-memory key-value store with sorted sets and
//! millisecond TTLs behind a length-prefixed binary protocol
//!
//! Keys hold either a plain string or a sorted set of scored members.
//! Expiry is millisecond-precision and enforced lazily on access, with a
//! background sweep for memory reclamation. Responses are tagged values:
//! nil, int, dbl, str, arr, err.

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Feature modules
pub mod cli;
pub mod commands;
pub mod network;
pub mod storage;

// Public API exports
pub use config::Config;
pub use error::{CommandError, ErrorKind, Result, ScoreKvError};

// Re-export commonly used types
pub use commands::{CommandRegistry, CommandResult, ResponseValue};
pub use network::TcpServer;
pub use storage::{MemoryStore, SortedSet, StoredValue, ValueType};

use commands::{
    DelCommand, GetCommand, PexpireCommand, PttlCommand, SetCommand, ZaddCommand, ZcardCommand,
    ZqueryCommand, ZremCommand, ZscoreCommand,
};
use std::sync::Arc;
use storage::ExpirationSweeper;

/// scorekv server instance with fully wired components
pub struct ScoreKvServer {
    config: Arc<Config>,
    storage: Arc<MemoryStore>,
    registry: Arc<CommandRegistry>,
    sweeper: Option<ExpirationSweeper>,
    tcp_server: TcpServer,
}

impl ScoreKvServer {
    /// Create a server with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let storage = Arc::new(MemoryStore::new());

        let mut registry = CommandRegistry::new();
        registry.register(Box::new(GetCommand));
        registry.register(Box::new(SetCommand));
        registry.register(Box::new(DelCommand));
        registry.register(Box::new(PexpireCommand));
        registry.register(Box::new(PttlCommand));
        registry.register(Box::new(ZaddCommand));
        registry.register(Box::new(ZscoreCommand));
        registry.register(Box::new(ZremCommand));
        registry.register(Box::new(ZcardCommand));
        registry.register(Box::new(ZqueryCommand));
        let registry = Arc::new(registry);

        let tcp_server = TcpServer::new(
            Arc::clone(&config),
            Arc::clone(&storage),
            Arc::clone(&registry),
        );

        Ok(Self {
            config,
            storage,
            registry,
            sweeper: None,
            tcp_server,
        })
    }

    /// Start serving on the configured address. Runs until shutdown.
    pub async fn start(&mut self) -> Result<()> {
        self.start_sweeper();
        tracing::info!(
            "starting scorekv with {} registered commands",
            self.registry.command_count()
        );
        self.tcp_server.start().await
    }

    /// Start serving in the background and return the bound address.
    /// With `server.port = 0` the OS picks a free port; used by tests.
    pub async fn start_with_addr(&mut self) -> Result<std::net::SocketAddr> {
        self.start_sweeper();
        tracing::info!(
            "starting scorekv with {} registered commands",
            self.registry.command_count()
        );
        self.tcp_server.start_with_addr().await
    }

    /// Signal the server and the sweeper to stop.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.tcp_server.shutdown();
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.shutdown().await?;
        }
        Ok(())
    }

    fn start_sweeper(&mut self) {
        if self.sweeper.is_none() {
            self.sweeper = Some(ExpirationSweeper::with_default_interval(Arc::clone(
                &self.storage,
            )));
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &MemoryStore {
        &self.storage
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}
