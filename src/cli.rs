use crate::config::{PollerConfig, CLOUDFLARE_ENDPOINT};
use clap::{Args, Parser};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct PollerArgs {
    /// JSON-RPC endpoint to poll blocks from.
    #[arg(long = "poller.endpoint", default_value = CLOUDFLARE_ENDPOINT)]
    pub endpoint: String,

    #[arg(long = "poller.interval-ms", default_value_t = 1000)]
    pub interval_ms: u64,

    /// Per-request timeout.
    #[arg(long = "poller.timeout-ms", default_value_t = 5000)]
    pub timeout_ms: u64,

    #[arg(long = "poller.max-idle-conns", default_value_t = 100)]
    pub max_idle_conns: usize,

    /// Maximum in-flight requests to the endpoint, 0 for unlimited.
    #[arg(long = "poller.max-conns-per-host", default_value_t = 100)]
    pub max_conns_per_host: usize,

    #[arg(long = "poller.max-idle-conns-per-host", default_value_t = 100)]
    pub max_idle_conns_per_host: usize,

    /// Attempts per request, including the first one.
    #[arg(long = "poller.num-retries", default_value_t = 3)]
    pub num_retries: usize,

    /// Number of fetched blocks buffered ahead of the pipeline.
    #[arg(long = "poller.queue-len", default_value_t = 10)]
    pub queue_len: usize,
}

impl PollerArgs {
    pub fn to_config(&self) -> PollerConfig {
        PollerConfig {
            endpoint: self.endpoint.clone(),
            poll_interval: Duration::from_millis(self.interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            max_idle_conns: self.max_idle_conns,
            max_conns_per_host: self.max_conns_per_host,
            max_idle_conns_per_host: self.max_idle_conns_per_host,
            num_retries: self.num_retries,
            queue_len: self.queue_len,
        }
    }
}

/// Polls an Ethereum node and serves transactions of subscribed addresses over HTTP.
#[derive(Debug, Parser)]
#[command(name = "eth-watch", version)]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(long = "server.addr", default_value = "localhost:8080")]
    pub server_addr: String,

    /// Reset stored transactions of an address once they are read.
    #[arg(long = "storage.reset", default_value_t = false)]
    pub storage_reset: bool,

    #[command(flatten)]
    pub poller: PollerArgs,

    /// Upper bound on the orderly shutdown after an interrupt.
    #[arg(long = "shutdown-timeout-ms", default_value_t = 5000)]
    pub shutdown_timeout_ms: u64,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl Cli {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn init_tracing(&self) {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let default_directives = if self.debug { "eth_watch=debug" } else { "eth_watch=info" };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
