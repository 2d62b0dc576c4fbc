//! Ingestion pipeline: drains the block queue, keeps the transactions touching subscribed
//! addresses, and coordinates the ordered shutdown of everything it depends on.


use crate::{
    error::{ParserError, PollerError, Result, StorageError},
    poller::BlockPoller,
    source::BlockSource,
    storage::{AddressStorage, AddressesMapStorage, TransactionStorage, TransactionsMapStorage},
    types::{Block, Transaction},
    utils::wait_for_flag,
};
use futures::{future::BoxFuture, FutureExt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Producer side of the pipeline: an ordered stream of blocks behind a bounded queue.
pub trait BlockStream: Send + Sync + 'static {
    fn init(&self) -> BoxFuture<'_, Result<(), PollerError>>;

    /// Produces blocks until shut down. The queue must be closed when this resolves.
    fn routine(&self) -> BoxFuture<'_, Result<(), PollerError>>;

    /// Requests the routine to stop. Must tolerate repeated calls.
    fn shutdown(&self);

    fn take_blocks(&self) -> Option<mpsc::Receiver<Block>>;

    fn last_block_number(&self) -> Option<u64>;
}

impl<BS: BlockSource> BlockStream for BlockPoller<BS> {
    fn init(&self) -> BoxFuture<'_, Result<(), PollerError>> {
        BlockPoller::<BS>::init(self).map(|result| result.map(|_| ())).boxed()
    }

    fn routine(&self) -> BoxFuture<'_, Result<(), PollerError>> {
        BlockPoller::<BS>::routine(self).boxed()
    }

    fn shutdown(&self) {
        BlockPoller::<BS>::shutdown(self)
    }

    fn take_blocks(&self) -> Option<mpsc::Receiver<Block>> {
        BlockPoller::<BS>::take_blocks(self)
    }

    fn last_block_number(&self) -> Option<u64> {
        BlockPoller::<BS>::last_block_number(self)
    }
}

/// Operations exposed to request handlers.
pub trait ParserApi: Send + Sync + 'static {
    /// Last block number processed, `None` before the first block.
    fn current_block(&self) -> Option<u64>;

    fn subscribe(&self, address: &str) -> Result<(), StorageError>;

    fn transactions(&self, address: &str) -> Result<Vec<Transaction>, StorageError>;
}

/// The parser wired with the production poller and in-memory storages.
pub type EthParser = Parser<BlockPoller, TransactionsMapStorage, AddressesMapStorage>;

#[derive(Debug)]
pub struct Parser<S, T, A> {
    stream: Arc<S>,
    transactions: T,
    subscriptions: A,
    /// Set once `run` returns: after the block queue is observed closed and fully drained,
    /// or when the pipeline dies early.
    drained_tx: watch::Sender<bool>,
    started: AtomicBool,
    shut_down: AtomicBool,
}

impl<S, T, A> Parser<S, T, A>
where
    S: BlockStream,
    T: TransactionStorage,
    A: AddressStorage,
{
    pub fn new(stream: S, transactions: T, subscriptions: A) -> Self {
        let (drained_tx, _) = watch::channel(false);
        Self {
            stream: Arc::new(stream),
            transactions,
            subscriptions,
            drained_tx,
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    pub async fn init(&self) -> Result<()> {
        info!("Initializing parser");
        self.stream.init().await?;
        self.transactions.init()?;
        self.subscriptions.init()?;
        info!("Parser successfully initialized");
        Ok(())
    }

    /// Starts the block stream and consumes its queue until it is closed.
    ///
    /// Returns the stream's own error, if any, once every queued block is processed.
    pub async fn run(&self) -> Result<()> {
        let mut blocks = self.stream.take_blocks().ok_or(ParserError::StreamTaken)?;
        self.started.store(true, Ordering::SeqCst);
        // Released on every exit, including a panic or abort of the task running this.
        let _finished = FinishedGuard(&self.drained_tx);

        let stream = self.stream.clone();
        let routine = tokio::spawn(async move { stream.routine().await });

        while let Some(block) = blocks.recv().await {
            self.process_block(block);
        }
        let result = routine.await;

        info!("Block queue drained");
        result??;
        Ok(())
    }

    fn process_block(&self, block: Block) {
        debug!("Got next block #{} with {} transactions", block.number, block.transactions.len());

        for transaction in &block.transactions {
            for address in transaction.addresses() {
                if !self.subscriptions.check(address) {
                    continue;
                }
                match self.transactions.store(address, transaction.clone()) {
                    Ok(()) => debug!("Stored transaction {} for {}", transaction.hash, address),
                    Err(err) => warn!(
                        "Could not store transaction {} for {}: {}",
                        transaction.hash, address, err
                    ),
                }
            }
        }
    }

    /// Two-phase shutdown: stop the stream and wait for the queue to drain, then shut the
    /// storages down. Only the first call has an effect.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            warn!("Parser shutdown already requested");
            return;
        }
        info!("Starting parser shutdown");

        self.stream.shutdown();
        if self.started.load(Ordering::SeqCst) {
            let mut drained_rx = self.drained_tx.subscribe();
            wait_for_flag(&mut drained_rx).await;
        }

        if let Err(err) = self.transactions.shutdown() {
            warn!("Got error on transactions storage shutdown: {}", err);
        }
        if let Err(err) = self.subscriptions.shutdown() {
            warn!("Got error on subscriptions storage shutdown: {}", err);
        }

        info!("Parser successfully shut down");
    }

    pub fn is_drained(&self) -> bool {
        *self.drained_tx.borrow()
    }
}

struct FinishedGuard<'a>(&'a watch::Sender<bool>);

impl Drop for FinishedGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

impl<S, T, A> ParserApi for Parser<S, T, A>
where
    S: BlockStream,
    T: TransactionStorage,
    A: AddressStorage,
{
    fn current_block(&self) -> Option<u64> {
        self.stream.last_block_number()
    }

    fn subscribe(&self, address: &str) -> Result<(), StorageError> {
        self.subscriptions.store(address).inspect_err(|err| {
            warn!("Could not store subscription for {}: {}", address, err);
        })?;
        info!("Subscribed {} successfully", address);
        Ok(())
    }

    fn transactions(&self, address: &str) -> Result<Vec<Transaction>, StorageError> {
        self.transactions.get(address).inspect_err(|err| {
            warn!("Could not get transactions for {}: {}", address, err);
        })
    }
}
