use crate::{error::SourceError, types::Block};
use futures::future::BoxFuture;
use std::sync::Arc;

pub mod jsonrpc;
pub mod retry;
mod rpc;

pub use retry::{classify, RetryAction, RetryPolicy};
pub use rpc::RpcBlockSource;

/// Remote producer of sequentially numbered blocks.
///
/// A block that does not exist yet must be reported as [`SourceError::NotAvailable`] so the
/// poller can wait for it instead of treating it as a failure.
pub trait BlockSource: Send + Sync + std::fmt::Debug + Unpin + 'static {
    fn fetch_latest_block_number(&self) -> BoxFuture<'static, Result<u64, SourceError>>;
    fn fetch_block(&self, number: u64) -> BoxFuture<'static, Result<Block, SourceError>>;
}

pub type BlockSourceBoxed = Arc<Box<dyn BlockSource>>;

impl BlockSource for BlockSourceBoxed {
    fn fetch_latest_block_number(&self) -> BoxFuture<'static, Result<u64, SourceError>> {
        self.as_ref().fetch_latest_block_number()
    }

    fn fetch_block(&self, number: u64) -> BoxFuture<'static, Result<Block, SourceError>> {
        self.as_ref().fetch_block(number)
    }
}
