use crate::source::{BlockSourceBoxed, RpcBlockSource};
use std::{sync::Arc, time::Duration};

pub const CLOUDFLARE_ENDPOINT: &str = "https://cloudflare-eth.com";

/// Settings shared by the block poller and the JSON-RPC client it polls through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub endpoint: String,
    pub poll_interval: Duration,

    /// Per-request timeout, covering connect, send and body read.
    pub timeout: Duration,
    pub max_idle_conns: usize,
    /// Upper bound on in-flight requests to the endpoint; `0` means unlimited.
    pub max_conns_per_host: usize,
    pub max_idle_conns_per_host: usize,
    pub num_retries: usize,

    /// Capacity of the block queue between poller and pipeline.
    pub queue_len: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoint: CLOUDFLARE_ENDPOINT.to_string(),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            max_idle_conns: 100,
            max_conns_per_host: 100,
            max_idle_conns_per_host: 100,
            num_retries: 3,
            queue_len: 10,
        }
    }
}

impl PollerConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_queue_len(mut self, queue_len: usize) -> Self {
        self.queue_len = queue_len;
        self
    }

    pub fn create_block_source(&self) -> BlockSourceBoxed {
        Arc::new(Box::new(RpcBlockSource::new(self)))
    }
}
