//! # Block Watcher
//!
//! Downstream listener started once bootstrap is ready. It waits the
//! listener binding delay, then follows the blocks read model and records
//! every new head height.
//!
//! ## Lifecycle
//!
//! 1. `new(blocks, delay)`: no task, no I/O
//! 2. `start()`: spawns the background task (at most one)
//! 3. `stop()`: signals the task; idempotent

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::read_model::{ReadModel, ReadModelUpdate};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatcherError {
    #[error("block watcher already running")]
    AlreadyRunning,
}

pub struct BlockWatcher {
    blocks: Arc<dyn ReadModel>,
    listener_delay: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    last_height: Arc<AtomicU64>,
}

impl BlockWatcher {
    pub fn new(blocks: Arc<dyn ReadModel>, listener_delay: Duration) -> Self {
        Self {
            blocks,
            listener_delay,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            last_height: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest block observed, 0 before the first one.
    pub fn last_height(&self) -> u64 {
        self.last_height.load(Ordering::SeqCst)
    }

    pub fn start(&self) -> Result<(), WatcherError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WatcherError::AlreadyRunning);
        }

        let blocks = Arc::clone(&self.blocks);
        let delay = self.listener_delay;
        let running = Arc::clone(&self.running);
        let shutdown = Arc::clone(&self.shutdown);
        let last_height = Arc::clone(&self.last_height);

        tokio::spawn(async move {
            Self::background_task(blocks, delay, running, shutdown, last_height).await;
        });
        Ok(())
    }

    async fn background_task(
        blocks: Arc<dyn ReadModel>,
        delay: Duration,
        running: Arc<AtomicBool>,
        shutdown: Arc<Notify>,
        last_height: Arc<AtomicU64>,
    ) {
        tokio::select! {
            _ = shutdown.notified() => {
                running.store(false, Ordering::SeqCst);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let mut rx = blocks.subscribe();
        debug!(delay_ms = delay.as_millis() as u64, "block watcher listening");

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("block watcher shutdown");
                    break;
                }
                update = rx.recv() => match update {
                    Ok(ReadModelUpdate::BlockAdded(height)) => {
                        let previous = last_height.fetch_max(height, Ordering::SeqCst);
                        if height > previous {
                            info!(height, "new block");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "block watcher lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("blocks read model closed");
                        break;
                    }
                },
            }
        }

        running.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        if self.running.load(Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }
}
