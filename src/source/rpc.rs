use super::{
    jsonrpc::{self, Payload, Request},
    BlockSource, RetryPolicy,
};
use crate::{
    config::PollerConfig,
    error::SourceError,
    types::{quantity, Block},
};
use futures::{future::BoxFuture, FutureExt};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Block source backed by an execution client's JSON-RPC endpoint (--poller.endpoint).
#[derive(Clone)]
pub struct RpcBlockSource {
    agent: ureq::Agent,
    endpoint: Arc<str>,
    retry: RetryPolicy,
    in_flight: Arc<Semaphore>,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for RpcBlockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcBlockSource")
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RpcBlockSource {
    pub fn new(config: &PollerConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .max_idle_connections(config.max_idle_conns)
            .max_idle_connections_per_host(config.max_idle_conns_per_host)
            .build()
            .into();
        let permits = match config.max_conns_per_host {
            0 => Semaphore::MAX_PERMITS,
            n => n,
        };

        Self {
            agent,
            endpoint: config.endpoint.as_str().into(),
            retry: RetryPolicy::new(config.num_retries),
            in_flight: Arc::new(Semaphore::new(permits)),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sends one JSON-RPC call, retrying transient transport failures, and returns the raw
    /// response body.
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<String, SourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = serde_json::to_string(&Request::new(id, method, params))?;
        debug!("Sending {} request #{}", method, id);

        self.retry.run(|| self.post(payload.clone())).await
    }

    async fn post(&self, payload: String) -> Result<String, SourceError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || {
            let body = agent
                .post(&*endpoint)
                .header("Content-Type", "application/json")
                .send(payload)?
                .into_body()
                .read_to_string()?;
            Ok::<_, SourceError>(body)
        })
        .await?
    }

    async fn block_number(&self) -> Result<u64, SourceError> {
        let body = self.call(jsonrpc::METHOD_BLOCK_NUMBER, serde_json::json!([])).await?;
        match jsonrpc::decode::<String>(&body)? {
            Payload::Result(raw) => quantity::parse(&raw).map_err(|e| {
                SourceError::Malformed(format!("could not parse block number {raw:?}: {e}"))
            }),
            Payload::Null => Err(SourceError::Malformed("empty block number result".into())),
            Payload::Error(e) => Err(SourceError::Rpc { code: e.code, message: e.message }),
        }
    }

    async fn block_by_number(&self, number: u64) -> Result<Block, SourceError> {
        let params = serde_json::json!([quantity::format(number), true]);
        let body = self.call(jsonrpc::METHOD_GET_BLOCK_BY_NUMBER, params).await?;
        match jsonrpc::decode::<Block>(&body)? {
            Payload::Result(block) => {
                if block.number != number {
                    warn!("Requested block #{} but got #{}", number, block.number);
                }
                Ok(block)
            }
            Payload::Null => Err(SourceError::NotAvailable(number)),
            Payload::Error(e) if e.code == jsonrpc::CODE_RESOURCE_NOT_FOUND => {
                Err(SourceError::NotAvailable(number))
            }
            Payload::Error(e) => Err(SourceError::Rpc { code: e.code, message: e.message }),
        }
    }
}

impl BlockSource for RpcBlockSource {
    fn fetch_latest_block_number(&self) -> BoxFuture<'static, Result<u64, SourceError>> {
        let this = self.clone();
        async move { this.block_number().await }.boxed()
    }

    fn fetch_block(&self, number: u64) -> BoxFuture<'static, Result<Block, SourceError>> {
        let this = self.clone();
        async move { this.block_by_number(number).await }.boxed()
    }
}
