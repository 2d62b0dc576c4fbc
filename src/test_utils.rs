//! In-memory doubles shared by the unit tests.

use crate::{
    error::SourceError,
    source::BlockSource,
    types::{Block, Transaction},
};
use futures::{future::BoxFuture, FutureExt};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

pub(crate) const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub(crate) struct MockState {
    latest: Option<u64>,
    blocks: BTreeMap<u64, Block>,
    /// Produce an empty block for any requested number.
    unbounded: bool,
    failures: HashMap<u64, VecDeque<SourceError>>,
    fetched: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockBlockSource(Arc<parking_lot::Mutex<MockState>>);

impl MockBlockSource {
    pub(crate) fn with_blocks(latest: u64, numbers: impl IntoIterator<Item = u64>) -> Self {
        let source = Self::default();
        {
            let mut state = source.0.lock();
            state.latest = Some(latest);
            for number in numbers {
                state.blocks.insert(number, block(number));
            }
        }
        source
    }

    pub(crate) fn unbounded(latest: u64) -> Self {
        let source = Self::with_blocks(latest, []);
        source.0.lock().unbounded = true;
        source
    }

    pub(crate) fn add_block(&self, number: u64) {
        self.0.lock().blocks.insert(number, block(number));
    }

    pub(crate) fn fail(&self, number: u64, err: SourceError) {
        self.0.lock().failures.entry(number).or_default().push_back(err);
    }

    pub(crate) fn fetched(&self) -> Vec<u64> {
        self.0.lock().fetched.clone()
    }
}

impl BlockSource for MockBlockSource {
    fn fetch_latest_block_number(&self) -> BoxFuture<'static, Result<u64, SourceError>> {
        let latest = self.0.lock().latest;
        async move { latest.ok_or_else(|| SourceError::Transport("connection refused".into())) }
            .boxed()
    }

    fn fetch_block(&self, number: u64) -> BoxFuture<'static, Result<Block, SourceError>> {
        let result = {
            let mut state = self.0.lock();
            state.fetched.push(number);
            if let Some(err) = state.failures.get_mut(&number).and_then(VecDeque::pop_front) {
                Err(err)
            } else if let Some(block) = state.blocks.get(&number) {
                Ok(block.clone())
            } else if state.unbounded {
                Ok(block(number))
            } else {
                Err(SourceError::NotAvailable(number))
            }
        };
        async move { result }.boxed()
    }
}

pub(crate) fn block(number: u64) -> Block {
    Block::new(number, vec![Transaction::new(format!("h{number}"), "from", "to")])
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < WAIT_LIMIT, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

pub(crate) async fn recv(rx: &mut mpsc::Receiver<Block>) -> Option<Block> {
    tokio::time::timeout(WAIT_LIMIT, rx.recv()).await.expect("queue stalled")
}
