//! Block poller: tracks the chain head of a [`BlockSource`] and feeds every new block, in
//! order, into a bounded queue.

mod frontier;

pub use frontier::Frontier;

use crate::{
    config::PollerConfig,
    error::{PollerError, SourceError},
    source::{BlockSource, BlockSourceBoxed},
    types::Block,
    utils::wait_for_flag,
};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Uninitialized,
    Ready,
    Polling,
    Draining,
    Stopped,
}

#[derive(Debug)]
struct Lifecycle {
    state: PollerState,
    /// Dropping the sender is what closes the queue.
    block_tx: Option<mpsc::Sender<Block>>,
}

/// A block poller that polls blocks from `BlockSource` and sends them to the block queue.
#[derive(Debug)]
pub struct BlockPoller<BS: BlockSource = BlockSourceBoxed> {
    source: BS,
    poll_interval: Duration,
    frontier: Frontier,
    lifecycle: Mutex<Lifecycle>,
    block_rx: Mutex<Option<mpsc::Receiver<Block>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<BS: BlockSource> BlockPoller<BS> {
    pub fn new(source: BS, config: &PollerConfig) -> Self {
        let (block_tx, block_rx) = mpsc::channel(config.queue_len.max(1));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            source,
            poll_interval: config.poll_interval,
            frontier: Frontier::default(),
            lifecycle: Mutex::new(Lifecycle {
                state: PollerState::Uninitialized,
                block_tx: Some(block_tx),
            }),
            block_rx: Mutex::new(Some(block_rx)),
            shutdown_tx,
        }
    }

    pub fn state(&self) -> PollerState {
        self.lifecycle.lock().state
    }

    pub fn initial_block_number(&self) -> Option<u64> {
        self.frontier.initial()
    }

    pub fn last_block_number(&self) -> Option<u64> {
        self.frontier.last()
    }

    /// Hands out the consuming end of the block queue. Only the first call gets it.
    pub fn take_blocks(&self) -> Option<mpsc::Receiver<Block>> {
        self.block_rx.lock().take()
    }

    /// Determines the starting frontier from the source's latest block number.
    pub async fn init(&self) -> Result<u64, PollerError> {
        info!("Initializing block poller");
        self.expect_state(PollerState::Uninitialized)?;

        let number = self.source.fetch_latest_block_number().await.map_err(PollerError::Init)?;
        self.frontier.set_initial(number);
        self.transition(PollerState::Uninitialized, PollerState::Ready)?;

        info!("Initial block #{}", number);
        Ok(number)
    }

    /// Runs the polling loop until shutdown. The queue is closed when this returns, whatever
    /// the outcome.
    pub async fn routine(&self) -> Result<(), PollerError> {
        let block_tx = {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.state {
                PollerState::Ready => {}
                PollerState::Stopped => {
                    info!("Block poller was shut down before it started");
                    return Ok(());
                }
                state => return Err(PollerError::InvalidState(state, PollerState::Ready)),
            }
            let Some(block_tx) = lifecycle.block_tx.take() else {
                return Err(PollerError::QueueClosed);
            };
            lifecycle.state = PollerState::Polling;
            block_tx
        };
        info!("Starting block poller");

        let result = self.poll(&block_tx).await;

        drop(block_tx);
        self.lifecycle.lock().state = PollerState::Stopped;
        info!("Block poller stopped, queue closed");
        result
    }

    async fn poll(&self, block_tx: &mpsc::Sender<Block>) -> Result<(), PollerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let initial = self
            .frontier
            .initial()
            .ok_or(PollerError::InvalidState(PollerState::Uninitialized, PollerState::Ready))?;

        // Skipping the starting point would silently lose blocks, so this one is fatal.
        let block = self
            .source
            .fetch_block(initial)
            .await
            .map_err(|source| PollerError::FirstBlock { number: initial, source })?;
        self.push(block_tx, initial, block).await?;

        loop {
            tokio::select! {
                biased;
                _ = wait_for_flag(&mut shutdown_rx) => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let Some(last) = self.frontier.last() else { continue };
            let next = last + 1;
            match self.source.fetch_block(next).await {
                Ok(block) => self.push(block_tx, next, block).await?,
                Err(SourceError::NotAvailable(_)) => debug!("Waiting for block #{}", next),
                Err(err) => warn!("Could not get block #{}: {}", next, err),
            }
        }

        self.transition(PollerState::Polling, PollerState::Draining).ok();
        Ok(())
    }

    /// Pushes first and advances after, so the frontier never runs ahead of the queue.
    async fn push(
        &self,
        block_tx: &mpsc::Sender<Block>,
        number: u64,
        block: Block,
    ) -> Result<(), PollerError> {
        let transactions = block.transactions.len();
        block_tx.send(block).await.map_err(|_| PollerError::QueueClosed)?;
        self.frontier.advance(number);
        debug!("Polled block #{} with {} transactions", number, transactions);
        Ok(())
    }

    /// Signals the polling loop to stop. Safe to call any number of times.
    ///
    /// A poller that never started polling closes its queue right away so that consumers
    /// still observe end-of-stream.
    pub fn shutdown(&self) {
        info!("Starting block poller shutdown");
        self.shutdown_tx.send_replace(true);

        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            PollerState::Uninitialized | PollerState::Ready => {
                lifecycle.block_tx = None;
                lifecycle.state = PollerState::Stopped;
            }
            PollerState::Polling => lifecycle.state = PollerState::Draining,
            PollerState::Draining | PollerState::Stopped => {}
        }
    }

    fn expect_state(&self, expected: PollerState) -> Result<(), PollerError> {
        let state = self.state();
        if state != expected {
            return Err(PollerError::InvalidState(state, expected));
        }
        Ok(())
    }

    fn transition(&self, from: PollerState, to: PollerState) -> Result<(), PollerError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != from {
            return Err(PollerError::InvalidState(lifecycle.state, from));
        }
        lifecycle.state = to;
        Ok(())
    }
}
