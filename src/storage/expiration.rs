//! Background expiration sweep
//!
//! Lazy checks on the access paths keep the engine correct on their own;
//! this sweeper exists to reclaim memory held by keys nobody touches
//! again. It ticks on a fixed interval, purging entries whose deadline has
//! passed, and shuts down over a command channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, warn};

use super::MemoryStore;
use crate::error::{Result, ScoreKvError};

#[derive(Debug)]
enum SweepCommand {
    Shutdown,
}

/// Periodic sweep over keys with a TTL, removing the ones already dead.
pub struct ExpirationSweeper {
    command_sender: mpsc::UnboundedSender<SweepCommand>,
    sweep_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ExpirationSweeper {
    /// Spawn the sweep task. Must be called from within a tokio runtime.
    pub fn new(store: Arc<MemoryStore>, sweep_interval: Duration) -> Self {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let sweep_handle = tokio::spawn(Self::sweep_task(store, command_receiver, sweep_interval));
        Self {
            command_sender,
            sweep_handle: Some(sweep_handle),
        }
    }

    /// Sweeper with the default 1 second interval.
    pub fn with_default_interval(store: Arc<MemoryStore>) -> Self {
        Self::new(store, Duration::from_secs(1))
    }

    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.command_sender.send(SweepCommand::Shutdown).is_err() {
            warn!("sweep task already gone at shutdown");
        }
        if let Some(handle) = self.sweep_handle.take() {
            handle.await.map_err(|e| ScoreKvError::InternalError {
                message: format!("expiration sweep task failed: {e}"),
                component: Some("expiration_sweeper".to_string()),
                source: None,
            })?;
        }
        Ok(())
    }

    async fn sweep_task(
        store: Arc<MemoryStore>,
        mut command_receiver: mpsc::UnboundedReceiver<SweepCommand>,
        sweep_interval: Duration,
    ) {
        let mut ticker = interval(sweep_interval);
        debug!("expiration sweep started, interval {:?}", sweep_interval);

        loop {
            tokio::select! {
                command = command_receiver.recv() => {
                    match command {
                        Some(SweepCommand::Shutdown) | None => break,
                    }
                }
                _ = ticker.tick() => {
                    let removed = store.cleanup_expired();
                    if removed > 0 {
                        debug!("sweep removed {removed} expired keys");
                    }
                }
            }
        }

        debug!("expiration sweep stopped");
    }
}

impl Drop for ExpirationSweeper {
    fn drop(&mut self) {
        if self.sweep_handle.is_some() {
            let _ = self.command_sender.send(SweepCommand::Shutdown);
        }
    }
}
